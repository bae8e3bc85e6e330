//! An in-memory, single-threaded channel hosting one inbound handler.
//!
//! Embedded channels carry codec implementations inside other handlers:
//! the owner writes inbound data, drains produced messages, and finishes the
//! channel to flush end-of-stream state. A channel is single-owner and must
//! not be shared across outer connections.

use std::collections::VecDeque;

use buffer::BufAllocator;
use thiserror::Error;
use tracing::debug;

use crate::handler::{HandlerContext, InboundHandler};
use crate::message::{Cause, ReferenceCounted};

/// Errors raised by the channel machinery itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The channel was finished and accepts no further events.
    #[error("channel is closed")]
    ChannelClosed,
}

struct ChannelCore<Out> {
    alloc: BufAllocator,
    auto_read: bool,
    active: bool,
    inbound: VecDeque<Out>,
    outbound: VecDeque<Out>,
    exceptions: VecDeque<Cause>,
    read_requests: usize,
    close_requested: bool,
}

impl<Out> HandlerContext<Out> for ChannelCore<Out> {
    fn fire_read(&mut self, msg: Out) {
        self.inbound.push_back(msg);
    }

    fn fire_read_complete(&mut self) {}

    fn fire_exception(&mut self, cause: Cause) {
        debug!(error = %cause, "embedded channel recorded an exception");
        self.exceptions.push_back(cause);
    }

    fn read(&mut self) {
        self.read_requests += 1;
    }

    fn is_auto_read(&self) -> bool {
        self.auto_read
    }

    fn write(&mut self, msg: Out) {
        self.outbound.push_back(msg);
    }

    fn flush(&mut self) {}

    fn close(&mut self) {
        self.close_requested = true;
    }

    fn alloc(&self) -> &BufAllocator {
        &self.alloc
    }
}

/// Single-handler in-memory channel.
pub struct EmbeddedChannel<H: InboundHandler> {
    handler: H,
    core: ChannelCore<H::Out>,
}

impl<H: InboundHandler> EmbeddedChannel<H> {
    /// Creates an active channel around `handler` with a fresh allocator.
    pub fn new(handler: H) -> Result<Self, Cause> {
        Self::with_allocator(handler, BufAllocator::new())
    }

    /// Creates an active channel using the caller's allocator.
    pub fn with_allocator(handler: H, alloc: BufAllocator) -> Result<Self, Cause> {
        let mut channel = Self {
            handler,
            core: ChannelCore {
                alloc,
                auto_read: true,
                active: true,
                inbound: VecDeque::new(),
                outbound: VecDeque::new(),
                exceptions: VecDeque::new(),
                read_requests: 0,
                close_requested: false,
            },
        };
        channel.handler.handler_added(&mut channel.core)?;
        channel.handler.channel_active(&mut channel.core)?;
        Ok(channel)
    }

    /// Switches auto-read off, so handlers must demand reads explicitly.
    pub fn set_auto_read(&mut self, auto_read: bool) {
        self.core.auto_read = auto_read;
    }

    /// `true` until [`EmbeddedChannel::finish`] ran.
    pub fn is_active(&self) -> bool {
        self.core.active
    }

    /// The channel's allocator.
    pub fn allocator(&self) -> &BufAllocator {
        &self.core.alloc
    }

    /// The hosted handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Number of `read()` demands handlers issued so far.
    pub fn read_requests(&self) -> usize {
        self.core.read_requests
    }

    /// Feeds one message to the handler and runs a read-complete round.
    /// Returns `true` when at least one produced message is queued.
    ///
    /// # Errors
    ///
    /// An error raised by the handler is routed through its
    /// `exception_caught` and then surfaces here unless the handler
    /// swallowed it.
    pub fn write_inbound(&mut self, msg: H::In) -> Result<bool, Cause> {
        if !self.core.active {
            return Err(PipelineError::ChannelClosed.into());
        }
        if let Err(cause) = self.handler.channel_read(&mut self.core, msg) {
            self.handler.exception_caught(&mut self.core, cause);
        }
        if let Err(cause) = self.handler.channel_read_complete(&mut self.core) {
            self.handler.exception_caught(&mut self.core, cause);
        }
        if self.core.close_requested {
            self.core.close_requested = false;
            return self.finish();
        }
        self.check_exception()?;
        Ok(!self.core.inbound.is_empty())
    }

    /// Drains one produced message, oldest first.
    pub fn read_inbound(&mut self) -> Option<H::Out> {
        self.core.inbound.pop_front()
    }

    /// Drains one message the handler queued outbound, oldest first.
    pub fn read_outbound(&mut self) -> Option<H::Out> {
        self.core.outbound.pop_front()
    }

    /// Number of produced messages still queued.
    pub fn pending_inbound(&self) -> usize {
        self.core.inbound.len()
    }

    /// Marks end-of-stream: fires `channel_inactive` and `handler_removed`,
    /// letting the handler flush residual output. Returns `true` when
    /// produced messages remain queued.
    pub fn finish(&mut self) -> Result<bool, Cause> {
        if self.core.active {
            self.core.active = false;
            if let Err(cause) = self.handler.channel_inactive(&mut self.core) {
                self.handler.exception_caught(&mut self.core, cause);
            }
            if let Err(cause) = self.handler.handler_removed(&mut self.core) {
                self.handler.exception_caught(&mut self.core, cause);
            }
        }
        self.check_exception()?;
        Ok(!self.core.inbound.is_empty())
    }

    fn check_exception(&mut self) -> Result<(), Cause> {
        match self.core.exceptions.pop_front() {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }
}

impl<H> EmbeddedChannel<H>
where
    H: InboundHandler,
    H::Out: ReferenceCounted,
{
    /// [`EmbeddedChannel::finish`] followed by a release of every queued
    /// message. Returns `true` when anything had been produced.
    pub fn finish_and_release_all(&mut self) -> Result<bool, Cause> {
        let produced = self.finish()?;
        while let Some(msg) = self.core.inbound.pop_front() {
            msg.release()?;
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{MessageDecoderHandler, MessageToMessageDecoder};
    use buffer::{ByteBuf, copied_buffer};

    /// Test decoder: duplicates payloads, swallows empty ones, fails on a
    /// poison byte.
    struct Doubler;

    impl MessageToMessageDecoder for Doubler {
        type Msg = ByteBuf;

        fn decode(
            &mut self,
            _ctx: &mut dyn HandlerContext<ByteBuf>,
            msg: ByteBuf,
            out: &mut Vec<ByteBuf>,
        ) -> Result<(), Cause> {
            if !msg.is_readable() {
                msg.release()?;
                return Ok(());
            }
            if msg.get_u8(msg.reader_index())? == 0xBD {
                msg.release()?;
                return Err("poisoned payload".into());
            }
            let copy = msg.copy(msg.reader_index(), msg.readable_bytes())?;
            out.push(msg);
            out.push(copy);
            Ok(())
        }
    }

    fn channel() -> EmbeddedChannel<MessageDecoderHandler<Doubler>> {
        EmbeddedChannel::new(MessageDecoderHandler::new(Doubler)).expect("channel")
    }

    #[test]
    fn write_then_read_preserves_order() {
        let mut ch = channel();
        assert!(ch.write_inbound(copied_buffer(b"a")).expect("write"));
        assert_eq!(ch.pending_inbound(), 2);
        let first = ch.read_inbound().expect("first");
        let second = ch.read_inbound().expect("second");
        assert_eq!(first.to_vec().expect("first bytes"), b"a");
        assert_eq!(second.to_vec().expect("second bytes"), b"a");
        assert!(ch.read_inbound().is_none());
    }

    #[test]
    fn decoder_error_surfaces_from_write_inbound() {
        let mut ch = channel();
        let err = ch
            .write_inbound(copied_buffer(&[0xBD]))
            .expect_err("poisoned write");
        assert_eq!(err.to_string(), "poisoned payload");
        // The channel keeps working afterwards.
        assert!(ch.write_inbound(copied_buffer(b"ok")).expect("write"));
    }

    #[test]
    fn empty_output_requests_read_when_not_auto_reading() {
        let mut ch = channel();
        ch.set_auto_read(false);
        assert!(!ch.write_inbound(copied_buffer(b"")).expect("write"));
        assert_eq!(ch.read_requests(), 1);

        // Output produced: no read demand.
        assert!(ch.write_inbound(copied_buffer(b"x")).expect("write"));
        assert_eq!(ch.read_requests(), 1);
    }

    #[test]
    fn auto_read_suppresses_read_demands() {
        let mut ch = channel();
        assert!(!ch.write_inbound(copied_buffer(b"")).expect("write"));
        assert_eq!(ch.read_requests(), 0);
    }

    #[test]
    fn finish_closes_the_channel() {
        let mut ch = channel();
        assert!(!ch.finish().expect("finish"));
        assert!(!ch.is_active());
        assert!(ch.write_inbound(copied_buffer(b"late")).is_err());
    }

    /// Test handler exercising the outbound surface: echoes a copy of the
    /// payload outbound and closes the channel on a control byte.
    struct EchoingCloser;

    impl MessageToMessageDecoder for EchoingCloser {
        type Msg = ByteBuf;

        fn decode(
            &mut self,
            ctx: &mut dyn HandlerContext<ByteBuf>,
            msg: ByteBuf,
            out: &mut Vec<ByteBuf>,
        ) -> Result<(), Cause> {
            let close = msg.get_u8(msg.reader_index())? == 0x04;
            let echo = msg.copy(msg.reader_index(), msg.readable_bytes())?;
            ctx.write(echo);
            ctx.flush();
            if close {
                ctx.close();
                msg.release()?;
            } else {
                out.push(msg);
            }
            Ok(())
        }
    }

    #[test]
    fn outbound_writes_are_queued_and_close_finishes() {
        let mut ch = EmbeddedChannel::new(MessageDecoderHandler::new(EchoingCloser))
            .expect("channel");
        ch.write_inbound(copied_buffer(b"ab")).expect("write");
        let echoed = ch.read_outbound().expect("outbound echo");
        assert_eq!(echoed.to_vec().expect("echo bytes"), b"ab");

        ch.write_inbound(copied_buffer(&[0x04])).expect("close byte");
        assert!(!ch.is_active(), "close request must finish the channel");
        assert!(ch.read_outbound().is_some());
    }

    #[test]
    fn finish_and_release_all_drains_the_queue() {
        let mut ch = channel();
        ch.write_inbound(copied_buffer(b"a")).expect("write");
        assert_eq!(ch.pending_inbound(), 2);
        assert!(ch.finish_and_release_all().expect("finish"));
        assert_eq!(ch.pending_inbound(), 0);
    }
}
