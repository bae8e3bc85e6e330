//! # Overview
//!
//! Streaming inflater stage hosted inside embedded channels.
//!
//! [`ZlibDecoder`] is an inbound handler consuming compressed [`ByteBuf`]s
//! and emitting decompressed ones. Input may arrive in arbitrary splits; the
//! decoder emits whatever each write made decodable and flushes the rest
//! when its channel finishes. The wrapper variant selects the stream
//! framing:
//!
//! - [`ZlibWrapper::None`] — a bare DEFLATE stream without header or
//!   trailer, the format permessage-deflate carries on the wire.
//! - [`ZlibWrapper::Zlib`] — RFC 1950 framing (2-byte header, Adler-32
//!   trailer), the `deflate` HTTP content coding.
//! - [`ZlibWrapper::Gzip`] — RFC 1952 framing, the `gzip` content coding.

use std::io::Write;
use std::mem;

use buffer::{ByteBuf, wrapped_buffer};
use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder as FlateZlibDecoder};
use pipeline::{Cause, HandlerContext, InboundHandler};
use tracing::trace;

use crate::error::CodecError;

/// Stream framing around the DEFLATE payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ZlibWrapper {
    /// Raw DEFLATE, no header or trailer.
    None,
    /// zlib (RFC 1950) framing.
    Zlib,
    /// gzip (RFC 1952) framing.
    Gzip,
}

enum Inflater {
    Raw(DeflateDecoder<Vec<u8>>),
    Zlib(FlateZlibDecoder<Vec<u8>>),
    Gzip(GzDecoder<Vec<u8>>),
}

impl Inflater {
    fn new(wrapper: ZlibWrapper) -> Self {
        match wrapper {
            ZlibWrapper::None => Self::Raw(DeflateDecoder::new(Vec::new())),
            ZlibWrapper::Zlib => Self::Zlib(FlateZlibDecoder::new(Vec::new())),
            ZlibWrapper::Gzip => Self::Gzip(GzDecoder::new(Vec::new())),
        }
    }

    fn write(&mut self, input: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Raw(decoder) => decoder.write_all(input),
            Self::Zlib(decoder) => decoder.write_all(input),
            Self::Gzip(decoder) => decoder.write_all(input),
        }
    }

    fn take_output(&mut self) -> Vec<u8> {
        match self {
            Self::Raw(decoder) => mem::take(decoder.get_mut()),
            Self::Zlib(decoder) => mem::take(decoder.get_mut()),
            Self::Gzip(decoder) => mem::take(decoder.get_mut()),
        }
    }

    fn try_finish(&mut self) -> std::io::Result<()> {
        match self {
            Self::Raw(decoder) => decoder.try_finish(),
            Self::Zlib(decoder) => decoder.try_finish(),
            Self::Gzip(decoder) => decoder.try_finish(),
        }
    }
}

/// Inbound handler that inflates compressed buffers.
pub struct ZlibDecoder {
    inflater: Inflater,
    wrapper: ZlibWrapper,
    finished: bool,
}

impl ZlibDecoder {
    /// Creates a decoder for the given stream framing.
    #[must_use]
    pub fn new(wrapper: ZlibWrapper) -> Self {
        Self {
            inflater: Inflater::new(wrapper),
            wrapper,
            finished: false,
        }
    }

    /// The framing this decoder expects.
    #[must_use]
    pub const fn wrapper(&self) -> ZlibWrapper {
        self.wrapper
    }

    /// Discards all inflater state, as if the stream started over.
    pub fn reset(&mut self) {
        self.inflater = Inflater::new(self.wrapper);
        self.finished = false;
    }
}

impl InboundHandler for ZlibDecoder {
    type In = ByteBuf;
    type Out = ByteBuf;

    fn channel_read(
        &mut self,
        ctx: &mut dyn HandlerContext<ByteBuf>,
        msg: ByteBuf,
    ) -> Result<(), Cause> {
        let input = msg.to_vec().map_err(CodecError::from);
        msg.release()?;
        let input = input?;
        self.inflater
            .write(&input)
            .map_err(|e| Cause::from(CodecError::Decompression(e)))?;
        let produced = self.inflater.take_output();
        if !produced.is_empty() {
            ctx.fire_read(wrapped_buffer(produced));
        }
        Ok(())
    }

    fn channel_inactive(
        &mut self,
        ctx: &mut dyn HandlerContext<ByteBuf>,
    ) -> Result<(), Cause> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.inflater
            .try_finish()
            .map_err(|e| Cause::from(CodecError::Decompression(e)))?;
        let residual = self.inflater.take_output();
        trace!(residual = residual.len(), "inflater finished");
        if !residual.is_empty() {
            ctx.fire_read(wrapped_buffer(residual));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use pipeline::EmbeddedChannel;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("compress");
        encoder.finish().expect("finish")
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("compress");
        encoder.finish().expect("finish")
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("compress");
        encoder.finish().expect("finish")
    }

    fn drain(channel: &mut EmbeddedChannel<ZlibDecoder>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(buf) = channel.read_inbound() {
            out.extend_from_slice(&buf.to_vec().expect("chunk"));
            buf.release().expect("release chunk");
        }
        out
    }

    #[test]
    fn raw_deflate_round_trip() {
        let mut channel = EmbeddedChannel::new(ZlibDecoder::new(ZlibWrapper::None)).expect("channel");
        channel
            .write_inbound(buffer::copied_buffer(&deflate(b"raw payload")))
            .expect("write");
        channel.finish().expect("finish");
        assert_eq!(drain(&mut channel), b"raw payload");
    }

    #[test]
    fn zlib_round_trip_with_split_input() {
        let compressed = zlib(b"zlib framed payload");
        let (head, tail) = compressed.split_at(compressed.len() / 2);
        let mut channel = EmbeddedChannel::new(ZlibDecoder::new(ZlibWrapper::Zlib)).expect("channel");
        channel
            .write_inbound(buffer::copied_buffer(head))
            .expect("write head");
        channel
            .write_inbound(buffer::copied_buffer(tail))
            .expect("write tail");
        channel.finish().expect("finish");
        assert_eq!(drain(&mut channel), b"zlib framed payload");
    }

    #[test]
    fn gzip_round_trip() {
        let mut channel = EmbeddedChannel::new(ZlibDecoder::new(ZlibWrapper::Gzip)).expect("channel");
        channel
            .write_inbound(buffer::copied_buffer(&gzip(b"gzip framed payload")))
            .expect("write");
        channel.finish().expect("finish");
        assert_eq!(drain(&mut channel), b"gzip framed payload");
    }

    #[test]
    fn corrupt_stream_reports_decompression_error() {
        let mut channel = EmbeddedChannel::new(ZlibDecoder::new(ZlibWrapper::Zlib)).expect("channel");
        let err = channel
            .write_inbound(buffer::copied_buffer(&[0x00, 0x01, 0x02, 0x03, 0xFF, 0xFF]))
            .expect_err("corrupt input");
        assert!(err.to_string().contains("decompression failed"));
    }

    #[test]
    fn input_buffer_is_released_after_decode() {
        let mut channel = EmbeddedChannel::new(ZlibDecoder::new(ZlibWrapper::None)).expect("channel");
        let input = buffer::copied_buffer(&deflate(b"x"));
        let watcher = input.duplicate().expect("watch");
        channel.write_inbound(input).expect("write");
        assert_eq!(watcher.ref_count(), 0, "decoder must release its input");
    }
}
