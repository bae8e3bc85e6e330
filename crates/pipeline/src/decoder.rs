//! Message-to-message decoding: one typed inbound message in, zero or more
//! out, with the backpressure bookkeeping shared by every decoder stage.

use crate::handler::{HandlerContext, InboundHandler};
use crate::message::Cause;

/// Transforms one inbound message into zero or more outbound messages of the
/// same pipeline message type.
///
/// Ownership of the input transfers to [`MessageToMessageDecoder::decode`]:
/// pushing it (or anything derived from it) into `out` hands it downstream,
/// anything consumed and not forwarded must be released before returning —
/// including on error paths.
pub trait MessageToMessageDecoder {
    /// The message type this decoder consumes and produces.
    type Msg;

    /// Decodes `msg`, appending replacements to `out`.
    fn decode(
        &mut self,
        ctx: &mut dyn HandlerContext<Self::Msg>,
        msg: Self::Msg,
        out: &mut Vec<Self::Msg>,
    ) -> Result<(), Cause>;

    /// Teardown hook, called from `handler_removed`.
    fn handler_removed(&mut self, ctx: &mut dyn HandlerContext<Self::Msg>) -> Result<(), Cause> {
        let _ = ctx;
        Ok(())
    }

    /// Teardown hook, called from `channel_inactive`.
    fn channel_inactive(&mut self, ctx: &mut dyn HandlerContext<Self::Msg>) -> Result<(), Cause> {
        let _ = ctx;
        Ok(())
    }
}

/// Adapter installing a [`MessageToMessageDecoder`] as an inbound handler.
///
/// The adapter owns the output list, fires one `channel_read` per produced
/// message in order, and implements the read-demand contract: when a
/// `channel_read` produced no output, the following `channel_read_complete`
/// issues an explicit `read()` unless the channel is in auto-read mode.
#[derive(Debug)]
pub struct MessageDecoderHandler<D> {
    decoder: D,
    need_read: bool,
}

impl<D> MessageDecoderHandler<D> {
    /// Wraps `decoder` for installation into a channel.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            need_read: false,
        }
    }

    /// The wrapped decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// The wrapped decoder, mutably.
    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }
}

impl<D: MessageToMessageDecoder> InboundHandler for MessageDecoderHandler<D> {
    type In = D::Msg;
    type Out = D::Msg;

    fn channel_read(
        &mut self,
        ctx: &mut dyn HandlerContext<Self::Out>,
        msg: Self::In,
    ) -> Result<(), Cause> {
        let mut out = Vec::new();
        let result = self.decoder.decode(ctx, msg, &mut out);
        self.need_read = out.is_empty();
        for produced in out {
            ctx.fire_read(produced);
        }
        result
    }

    fn channel_read_complete(
        &mut self,
        ctx: &mut dyn HandlerContext<Self::Out>,
    ) -> Result<(), Cause> {
        ctx.fire_read_complete();
        if self.need_read && !ctx.is_auto_read() {
            ctx.read();
        }
        Ok(())
    }

    fn handler_removed(&mut self, ctx: &mut dyn HandlerContext<Self::Out>) -> Result<(), Cause> {
        self.decoder.handler_removed(ctx)
    }

    fn channel_inactive(&mut self, ctx: &mut dyn HandlerContext<Self::Out>) -> Result<(), Cause> {
        self.decoder.channel_inactive(ctx)
    }
}
