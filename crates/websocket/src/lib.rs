#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `websocket` provides the server side of the RFC 6455 opening handshake
//! (protocol version 13) and the RFC 7692 permessage-deflate payload
//! decoder, both built on the buffer and pipeline layers.
//!
//! The wire-level frame codec itself lives outside this crate; the
//! [`WebSocketServerHandshaker`] hands its caller the
//! [`WebSocketDecoderConfig`] that codec should be constructed with, and
//! the [`PerMessageDeflateDecoder`] slots in behind it to reconstruct
//! compressed text and binary messages frame by frame.

mod config;
mod deflate;
mod frame;
mod handshake;

pub use config::{ConfigError, WebSocketDecoderConfig, WebSocketDecoderConfigBuilder};
pub use deflate::{
    DeflateDecoderPolicy, DeflateFrameDecoder, ExtensionDecoderFilter, FRAME_TAIL, PerFrame,
    PerFrameDeflateDecoder, PerMessage, PerMessageDeflateDecoder, never_skip,
};
pub use frame::{Opcode, RSV1, RSV2, RSV3, WebSocketFrame};
pub use handshake::{HandshakeError, WEBSOCKET_GUID, WebSocketServerHandshaker};
