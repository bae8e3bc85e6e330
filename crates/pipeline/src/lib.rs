#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pipeline` defines the composable stream-transform abstraction the
//! ironpipe codecs build on: the [`InboundHandler`] event contract, the
//! [`HandlerContext`] a handler observes and emits through, the
//! [`MessageToMessageDecoder`] machinery with its read-demand backpressure
//! hook, and the [`EmbeddedChannel`] — an in-memory single-handler channel
//! used to host codec implementations inside other handlers.
//!
//! # Event model
//!
//! Handlers run on one thread and see events in arrival order:
//! `handler_added`, `channel_active`, any number of `channel_read` /
//! `channel_read_complete` rounds, then `channel_inactive` and
//! `handler_removed`. Errors never unwind through a channel; the machinery
//! routes them to `exception_caught`, which by default forwards them
//! downstream until some handler consumes them.
//!
//! # Release discipline
//!
//! Messages are [`ReferenceCounted`] and move with exactly one owning
//! reference. A decoder owns its input: forwarding it into the output list
//! hands that reference downstream, while consuming it requires an explicit
//! release — also on error paths.

mod decoder;
mod embedded;
mod handler;
mod message;

pub use decoder::{MessageDecoderHandler, MessageToMessageDecoder};
pub use embedded::{EmbeddedChannel, PipelineError};
pub use handler::{HandlerContext, InboundHandler};
pub use message::{Cause, ReferenceCounted};
