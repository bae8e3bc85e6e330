//! # Overview
//!
//! Permessage-deflate payload decoding (RFC 7692).
//!
//! Compressed frames carry a raw DEFLATE stream with the final four bytes
//! `00 00 FF FF` of the last sync-flush block removed. The decoder restores
//! that trailer when a message ends, streams the payload through an
//! embedded raw-deflate channel, and reassembles the inflated parts into a
//! composite direct buffer — the replacement frame's payload — clearing
//! RSV1 on the way out.
//!
//! Context take-over is the sender carrying its LZ77 window across
//! messages. With `no_context` the inflater is torn down after every final
//! fragment instead, so each message decodes against a fresh dictionary.

use buffer::wrapped_buffer;
use codec::{CodecError, ZlibDecoder, ZlibWrapper};
use pipeline::{
    Cause, EmbeddedChannel, HandlerContext, MessageDecoderHandler, MessageToMessageDecoder,
    ReferenceCounted,
};
use tracing::debug;

use crate::frame::{Opcode, RSV1, WebSocketFrame};

/// The sync-flush trailer restored before inflating a message's final
/// fragment.
pub const FRAME_TAIL: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Predicate returning `true` for frames the decoder must leave untouched.
pub type ExtensionDecoderFilter = fn(&WebSocketFrame) -> bool;

/// The default filter: nothing is skipped.
#[must_use]
pub fn never_skip(_frame: &WebSocketFrame) -> bool {
    false
}

/// Variation points of the deflate frame decoder.
pub trait DeflateDecoderPolicy {
    /// `true` when the four-byte trailer must be appended after this
    /// fragment's payload.
    fn appends_frame_tail(&self, final_fragment: bool) -> bool;

    /// Reserved bits of the replacement frame, given the input frame's.
    fn new_rsv(&self, rsv: u8) -> u8;
}

/// Per-message extension behaviour: the trailer closes a message, and RSV1
/// is cleared once the payload is decoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerMessage;

impl DeflateDecoderPolicy for PerMessage {
    fn appends_frame_tail(&self, final_fragment: bool) -> bool {
        final_fragment
    }

    fn new_rsv(&self, rsv: u8) -> u8 {
        if rsv & RSV1 == 0 { rsv } else { rsv ^ RSV1 }
    }
}

/// Per-frame (deflate-frame) behaviour: every frame is a complete deflate
/// unit, so the trailer is appended to each one.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerFrame;

impl DeflateDecoderPolicy for PerFrame {
    fn appends_frame_tail(&self, _final_fragment: bool) -> bool {
        true
    }

    fn new_rsv(&self, rsv: u8) -> u8 {
        if rsv & RSV1 == 0 { rsv } else { rsv ^ RSV1 }
    }
}

/// Frame decoder inflating compressed text/binary messages.
pub struct DeflateFrameDecoder<P> {
    policy: P,
    no_context: bool,
    filter: ExtensionDecoderFilter,
    decoder: Option<EmbeddedChannel<ZlibDecoder>>,
}

/// The RFC 7692 permessage-deflate decoder.
pub type PerMessageDeflateDecoder = DeflateFrameDecoder<PerMessage>;

/// The legacy deflate-frame decoder.
pub type PerFrameDeflateDecoder = DeflateFrameDecoder<PerFrame>;

impl PerMessageDeflateDecoder {
    /// Creates a permessage-deflate decoder. With `no_context` the inflater
    /// restarts after every message (no LZ77 context carried across).
    #[must_use]
    pub fn new(no_context: bool) -> Self {
        Self::with_policy(PerMessage, no_context)
    }
}

impl PerFrameDeflateDecoder {
    /// Creates a deflate-frame decoder.
    #[must_use]
    pub fn new(no_context: bool) -> Self {
        Self::with_policy(PerFrame, no_context)
    }
}

impl<P: DeflateDecoderPolicy> DeflateFrameDecoder<P> {
    /// Creates a decoder with the default never-skip filter.
    pub fn with_policy(policy: P, no_context: bool) -> Self {
        Self::with_filter(policy, no_context, never_skip)
    }

    /// Creates a decoder with an explicit extension filter.
    pub fn with_filter(policy: P, no_context: bool, filter: ExtensionDecoderFilter) -> Self {
        Self {
            policy,
            no_context,
            filter,
            decoder: None,
        }
    }

    /// Wraps this decoder for installation into a channel.
    pub fn into_handler(self) -> MessageDecoderHandler<Self> {
        MessageDecoderHandler::new(self)
    }

    /// Decides whether `frame` goes through the inflater or passes through.
    fn should_decode(&self, frame: &WebSocketFrame) -> Result<bool, Cause> {
        if (self.filter)(frame) {
            if self.decoder.is_some() {
                // Skipping mid-message would desynchronise the stream.
                return Err(CodecError::UnexpectedFrameType(frame.opcode.name()).into());
            }
            return Ok(false);
        }
        Ok(match frame.opcode {
            Opcode::Text | Opcode::Binary => frame.rsv & RSV1 != 0,
            Opcode::Continuation => self.decoder.is_some() || frame.rsv & RSV1 != 0,
            Opcode::Ping | Opcode::Pong | Opcode::Close => false,
        })
    }

    fn decompress(
        &mut self,
        ctx: &mut dyn HandlerContext<WebSocketFrame>,
        frame: WebSocketFrame,
        out: &mut Vec<WebSocketFrame>,
    ) -> Result<(), Cause> {
        let WebSocketFrame {
            opcode,
            final_fragment,
            rsv,
            payload,
        } = frame;

        match opcode {
            Opcode::Text | Opcode::Binary => {
                if self.decoder.is_none() {
                    self.decoder = Some(EmbeddedChannel::with_allocator(
                        ZlibDecoder::new(ZlibWrapper::None),
                        ctx.alloc().clone(),
                    )?);
                }
            }
            Opcode::Continuation if self.decoder.is_some() => {}
            Opcode::Continuation => {
                payload.release()?;
                return Err(CodecError::UnexpectedInitialFrameType(opcode.name()).into());
            }
            Opcode::Ping | Opcode::Pong | Opcode::Close => {
                payload.release()?;
                return Err(CodecError::UnexpectedFrameType(opcode.name()).into());
            }
        }
        let Some(decoder) = self.decoder.as_mut() else {
            payload.release()?;
            return Err(CodecError::UnexpectedInitialFrameType(opcode.name()).into());
        };

        let readable = payload.is_readable();
        decoder.write_inbound(payload)?;
        if self.policy.appends_frame_tail(final_fragment) {
            decoder.write_inbound(wrapped_buffer(FRAME_TAIL.to_vec()))?;
        }

        let mut assembled = ctx.alloc().composite_direct_buffer();
        while let Some(part) = decoder.read_inbound() {
            if part.is_readable() {
                assembled.add_component(true, part)?;
            } else {
                part.release()?;
            }
        }
        if readable && assembled.num_components()? == 0 {
            // Bytes went in, nothing came out: the peer sent a payload that
            // is not a deflate continuation of this message.
            assembled.release()?;
            return Err(CodecError::CannotReadUncompressed.into());
        }

        if final_fragment && self.no_context {
            self.cleanup();
        }

        out.push(WebSocketFrame::new(
            opcode,
            final_fragment,
            self.policy.new_rsv(rsv),
            assembled,
        ));
        Ok(())
    }

    /// Finishes the inflater and drops the reference. Finish errors are
    /// logged and swallowed; the reference is cleared either way.
    fn cleanup(&mut self) {
        if let Some(mut decoder) = self.decoder.take()
            && let Err(cause) = decoder.finish_and_release_all()
        {
            debug!(error = %cause, "deflate decoder teardown failed");
        }
    }
}

impl<P: DeflateDecoderPolicy> MessageToMessageDecoder for DeflateFrameDecoder<P> {
    type Msg = WebSocketFrame;

    fn decode(
        &mut self,
        ctx: &mut dyn HandlerContext<WebSocketFrame>,
        frame: WebSocketFrame,
        out: &mut Vec<WebSocketFrame>,
    ) -> Result<(), Cause> {
        match self.should_decode(&frame) {
            Ok(true) => self.decompress(ctx, frame, out),
            Ok(false) => {
                out.push(frame);
                Ok(())
            }
            Err(cause) => {
                frame.release()?;
                Err(cause)
            }
        }
    }

    fn handler_removed(
        &mut self,
        _ctx: &mut dyn HandlerContext<WebSocketFrame>,
    ) -> Result<(), Cause> {
        self.cleanup();
        Ok(())
    }

    fn channel_inactive(
        &mut self,
        _ctx: &mut dyn HandlerContext<WebSocketFrame>,
    ) -> Result<(), Cause> {
        self.cleanup();
        Ok(())
    }
}
