//! # Overview
//!
//! Transparent HTTP body decompression, placed immediately after the HTTP
//! object decoder.
//!
//! The stage watches headers-bearing messages for a `Content-Encoding` it
//! can decode. When its policy supplies an inflater, body chunks stream
//! through an embedded channel and come out decoded, while the framing
//! headers are rewritten to match: `Content-Length` is dropped in favour of
//! `Transfer-Encoding: chunked` (the decoded length is unknown until end of
//! stream) and `Content-Encoding` becomes the policy's target coding, or
//! disappears entirely for `identity`.
//!
//! Two pass-through rules keep interim protocol traffic intact: a
//! `100 Continue` response and everything up to its terminating last-content
//! are forwarded untouched, and any encoding the policy declines leaves the
//! whole message unchanged.

use buffer::BufAllocator;
use codec::{ZlibDecoder, ZlibWrapper};
use pipeline::{
    Cause, EmbeddedChannel, HandlerContext, MessageDecoderHandler, MessageToMessageDecoder,
};
use tracing::{debug, trace};

use crate::headers::{HeaderMap, names, values};
use crate::message::{HttpContent, HttpObject, LastHttpContent, StatusCode};

/// Chooses the inflater for a content coding.
pub trait ContentDecoderPolicy {
    /// Returns the embedded channel that decodes `encoding`d content, or
    /// `None` to pass the message through untouched.
    fn new_content_decoder(
        &mut self,
        encoding: &str,
        alloc: &BufAllocator,
    ) -> Result<Option<EmbeddedChannel<ZlibDecoder>>, Cause>;

    /// Content coding advertised downstream after decoding. The default,
    /// `identity`, removes the `Content-Encoding` header entirely.
    fn target_content_encoding(&self, source: &str) -> &str {
        let _ = source;
        values::IDENTITY
    }
}

/// Streaming HTTP content decoder stage.
///
/// Install as a [`MessageDecoderHandler`] wrapping this decoder. Per
/// connection state only: the embedded sub-pipeline is exclusively owned and
/// torn down when the handler leaves the pipeline or the channel closes.
pub struct HttpContentDecoder<P> {
    policy: P,
    decoder: Option<EmbeddedChannel<ZlibDecoder>>,
    continue_response: bool,
}

impl<P: ContentDecoderPolicy> HttpContentDecoder<P> {
    /// Creates a decoder stage driven by `policy`.
    pub fn with_policy(policy: P) -> Self {
        Self {
            policy,
            decoder: None,
            continue_response: false,
        }
    }

    /// `true` while an inflater is installed for the current message.
    #[must_use]
    pub const fn is_decoding(&self) -> bool {
        self.decoder.is_some()
    }

    /// Wraps this decoder for installation into a channel.
    pub fn into_handler(self) -> MessageDecoderHandler<Self> {
        MessageDecoderHandler::new(self)
    }

    fn decode_head(
        &mut self,
        ctx: &mut dyn HandlerContext<HttpObject>,
        mut msg: HttpObject,
        out: &mut Vec<HttpObject>,
    ) -> Result<(), Cause> {
        // A new message tears down whatever the previous one left behind.
        self.teardown(ctx);

        let encoding = msg
            .headers()
            .and_then(|headers| headers.get_str(names::CONTENT_ENCODING))
            .map_or_else(|| values::IDENTITY.to_owned(), |v| v.trim().to_owned());

        let Some(channel) = self.policy.new_content_decoder(&encoding, ctx.alloc())? else {
            // Pass-through: no decoder installed, message forwarded as-is.
            out.push(msg);
            return Ok(());
        };
        trace!(encoding = %encoding, "installing content decoder");
        self.decoder = Some(channel);

        if let Some(headers) = msg.headers_mut() {
            // The decoded length is unknown until end of stream.
            if headers.remove(names::CONTENT_LENGTH) > 0 {
                headers.set(names::TRANSFER_ENCODING, values::CHUNKED);
            }
            let target = self.policy.target_content_encoding(&encoding).to_owned();
            if target.eq_ignore_ascii_case(values::IDENTITY) {
                headers.remove(names::CONTENT_ENCODING);
            } else {
                headers.set(names::CONTENT_ENCODING, target.as_str());
            }
        }

        match msg {
            // A full message must not surface as a last-content variant:
            // trailing handlers would take it for end-of-message before the
            // decoded body follows. Emit a plain head (decoder result
            // preserved) and stream the body through the inflater.
            HttpObject::FullRequest(full) => {
                out.push(HttpObject::RequestHead(full.head));
                self.decode_payload(full.body, out)?;
                self.finish_decode(ctx, full.trailing_headers, out)
            }
            HttpObject::FullResponse(full) => {
                out.push(HttpObject::ResponseHead(full.head));
                self.decode_payload(full.body, out)?;
                self.finish_decode(ctx, full.trailing_headers, out)
            }
            head => {
                out.push(head);
                Ok(())
            }
        }
    }

    fn decode_payload(
        &mut self,
        data: buffer::ByteBuf,
        out: &mut Vec<HttpObject>,
    ) -> Result<(), Cause> {
        let Some(decoder) = self.decoder.as_mut() else {
            out.push(HttpObject::Content(HttpContent::new(data)));
            return Ok(());
        };
        decoder.write_inbound(data)?;
        while let Some(buf) = decoder.read_inbound() {
            if buf.is_readable() {
                out.push(HttpObject::Content(HttpContent::new(buf)));
            } else {
                buf.release()?;
            }
        }
        Ok(())
    }

    fn finish_decode(
        &mut self,
        ctx: &mut dyn HandlerContext<HttpObject>,
        trailing_headers: HeaderMap,
        out: &mut Vec<HttpObject>,
    ) -> Result<(), Cause> {
        if let Some(mut decoder) = self.decoder.take()
            && decoder.finish()?
        {
            while let Some(buf) = decoder.read_inbound() {
                if buf.is_readable() {
                    out.push(HttpObject::Content(HttpContent::new(buf)));
                } else {
                    buf.release()?;
                }
            }
        }
        out.push(HttpObject::LastContent(LastHttpContent::new(
            ctx.alloc().empty(),
            trailing_headers,
        )));
        Ok(())
    }

    /// Finishes and releases the embedded decoder. Errors are translated
    /// into `exception_caught` and never abort the chain.
    fn teardown(&mut self, ctx: &mut dyn HandlerContext<HttpObject>) {
        if let Some(mut decoder) = self.decoder.take()
            && let Err(cause) = decoder.finish_and_release_all()
        {
            debug!(error = %cause, "content decoder teardown failed");
            ctx.fire_exception(cause);
        }
    }
}

impl<P: ContentDecoderPolicy> MessageToMessageDecoder for HttpContentDecoder<P> {
    type Msg = HttpObject;

    fn decode(
        &mut self,
        ctx: &mut dyn HandlerContext<HttpObject>,
        msg: HttpObject,
        out: &mut Vec<HttpObject>,
    ) -> Result<(), Cause> {
        let is_continue = match &msg {
            HttpObject::ResponseHead(head) => head.status == StatusCode::CONTINUE,
            HttpObject::FullResponse(full) => full.head.status == StatusCode::CONTINUE,
            _ => false,
        };
        if is_continue {
            // The provisional response itself never carries a body; hold the
            // pass-through until its terminating last-content goes by.
            if !msg.is_last_content() {
                self.continue_response = true;
            }
            out.push(msg);
            return Ok(());
        }
        if self.continue_response {
            if msg.is_last_content() {
                self.continue_response = false;
            }
            out.push(msg);
            return Ok(());
        }

        match msg {
            msg @ (HttpObject::RequestHead(_)
            | HttpObject::ResponseHead(_)
            | HttpObject::FullRequest(_)
            | HttpObject::FullResponse(_)) => self.decode_head(ctx, msg, out),
            HttpObject::Content(content) => {
                if self.decoder.is_some() {
                    self.decode_payload(content.data, out)
                } else {
                    out.push(HttpObject::Content(content));
                    Ok(())
                }
            }
            HttpObject::LastContent(last) => {
                if self.decoder.is_some() {
                    self.decode_payload(last.data, out)?;
                    self.finish_decode(ctx, last.trailing_headers, out)
                } else {
                    out.push(HttpObject::LastContent(last));
                    Ok(())
                }
            }
        }
    }

    fn handler_removed(&mut self, ctx: &mut dyn HandlerContext<HttpObject>) -> Result<(), Cause> {
        self.teardown(ctx);
        Ok(())
    }

    fn channel_inactive(&mut self, ctx: &mut dyn HandlerContext<HttpObject>) -> Result<(), Cause> {
        self.teardown(ctx);
        Ok(())
    }
}

/// Policy decoding the standard `gzip` and `deflate` codings (and their
/// legacy `x-` aliases); everything else passes through.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decompressor;

impl ContentDecoderPolicy for Decompressor {
    fn new_content_decoder(
        &mut self,
        encoding: &str,
        alloc: &BufAllocator,
    ) -> Result<Option<EmbeddedChannel<ZlibDecoder>>, Cause> {
        let wrapper = if encoding.eq_ignore_ascii_case(values::GZIP)
            || encoding.eq_ignore_ascii_case("x-gzip")
        {
            Some(ZlibWrapper::Gzip)
        } else if encoding.eq_ignore_ascii_case(values::DEFLATE)
            || encoding.eq_ignore_ascii_case("x-deflate")
        {
            Some(ZlibWrapper::Zlib)
        } else {
            None
        };
        match wrapper {
            Some(wrapper) => Ok(Some(EmbeddedChannel::with_allocator(
                ZlibDecoder::new(wrapper),
                alloc.clone(),
            )?)),
            None => Ok(None),
        }
    }
}

/// Content decoder stage for the standard codings.
pub type HttpContentDecompressor = HttpContentDecoder<Decompressor>;

impl HttpContentDecompressor {
    /// Creates the standard decompressing stage.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Decompressor)
    }
}

impl Default for HttpContentDecompressor {
    fn default() -> Self {
        Self::new()
    }
}
