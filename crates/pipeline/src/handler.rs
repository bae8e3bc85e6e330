//! The inbound handler contract and the context handlers act through.
//!
//! A handler observes lifecycle and read events in arrival order on a single
//! thread and emits downstream through its [`HandlerContext`]. Outputs for
//! one event are all dispatched before the next event is processed.

use buffer::BufAllocator;

use crate::message::Cause;

/// The API a handler uses to observe and emit events.
///
/// `Out` is the message type the handler sends downstream. Emission order is
/// preserved: messages appear downstream in the order they were fired.
pub trait HandlerContext<Out> {
    /// Emits one message downstream.
    fn fire_read(&mut self, msg: Out);

    /// Signals the end of the current read batch downstream.
    fn fire_read_complete(&mut self);

    /// Routes an error downstream through `exception_caught` handlers.
    fn fire_exception(&mut self, cause: Cause);

    /// Requests that the source read more data. Meaningful when the channel
    /// is not in auto-read mode; the backpressure hook.
    fn read(&mut self);

    /// `true` when the channel reads continuously without explicit
    /// [`HandlerContext::read`] requests.
    fn is_auto_read(&self) -> bool;

    /// Queues one message for the outbound direction.
    fn write(&mut self, msg: Out);

    /// Flushes queued outbound messages towards the transport.
    fn flush(&mut self);

    /// Requests that the channel close once the current event completes.
    fn close(&mut self);

    /// The channel's buffer allocator.
    fn alloc(&self) -> &BufAllocator;
}

/// An inbound pipeline stage.
///
/// Lifecycle methods default to no-ops; `channel_read_complete` defaults to
/// forwarding the event. Errors returned from any method are caught by the
/// surrounding machinery and routed to [`InboundHandler::exception_caught`],
/// never unwound through the channel.
pub trait InboundHandler {
    /// Message type this handler consumes.
    type In;
    /// Message type this handler emits.
    type Out;

    /// Called once after the handler was installed.
    fn handler_added(&mut self, ctx: &mut dyn HandlerContext<Self::Out>) -> Result<(), Cause> {
        let _ = ctx;
        Ok(())
    }

    /// Called once after the handler was removed; the place to free any
    /// resources still held.
    fn handler_removed(&mut self, ctx: &mut dyn HandlerContext<Self::Out>) -> Result<(), Cause> {
        let _ = ctx;
        Ok(())
    }

    /// The channel became active.
    fn channel_active(&mut self, ctx: &mut dyn HandlerContext<Self::Out>) -> Result<(), Cause> {
        let _ = ctx;
        Ok(())
    }

    /// The channel went inactive; no further reads will arrive.
    fn channel_inactive(&mut self, ctx: &mut dyn HandlerContext<Self::Out>) -> Result<(), Cause> {
        let _ = ctx;
        Ok(())
    }

    /// One inbound message arrived. Ownership of `msg` transfers to the
    /// handler, which must emit, hold (retained), or release it.
    fn channel_read(
        &mut self,
        ctx: &mut dyn HandlerContext<Self::Out>,
        msg: Self::In,
    ) -> Result<(), Cause>;

    /// The current read batch ended.
    fn channel_read_complete(
        &mut self,
        ctx: &mut dyn HandlerContext<Self::Out>,
    ) -> Result<(), Cause> {
        ctx.fire_read_complete();
        Ok(())
    }

    /// An error reached this handler. The default forwards it downstream.
    fn exception_caught(&mut self, ctx: &mut dyn HandlerContext<Self::Out>, cause: Cause) {
        ctx.fire_exception(cause);
    }
}
