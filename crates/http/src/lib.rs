#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `http` carries the HTTP/1 object model used by the ironpipe pipeline —
//! heads, content chunks, full messages, and the ordered case-insensitive
//! [`HeaderMap`] — together with the [`HttpContentDecoder`] stage that
//! transparently decompresses message bodies while rewriting the framing
//! headers.
//!
//! Wire-level decoding is out of scope: objects enter this crate already
//! parsed, each carrying the [`DecoderResult`] of the stage that produced
//! it.

mod content_decoder;
mod headers;
mod message;

pub use content_decoder::{
    ContentDecoderPolicy, Decompressor, HttpContentDecoder, HttpContentDecompressor,
};
pub use headers::{HeaderMap, names, values};
pub use message::{
    DecoderResult, FullRequest, FullResponse, HttpContent, HttpObject, HttpVersion,
    LastHttpContent, Method, RequestHead, ResponseHead, StatusCode,
};
