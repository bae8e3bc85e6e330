#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `codec` collects what the protocol stages share: the [`CodecError`]
//! vocabulary for protocol violations, and the streaming [`ZlibDecoder`]
//! inflater stage that the HTTP content decoder and the WebSocket
//! permessage-deflate decoder host inside their embedded channels.

mod error;
mod zlib;

pub use error::CodecError;
pub use zlib::{ZlibDecoder, ZlibWrapper};
