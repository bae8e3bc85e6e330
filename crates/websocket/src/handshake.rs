//! # Overview
//!
//! RFC 6455 opening handshake, server side, protocol version 13.
//!
//! The handshaker turns an aggregated upgrade request into the
//! `101 Switching Protocols` response: it derives `Sec-WebSocket-Accept`
//! from the client key and the protocol GUID (SHA-1, then Base64) and
//! negotiates an optional subprotocol from the client's comma-separated
//! offer. Installing the wire codec afterwards is the caller's job; the
//! handshaker carries the [`WebSocketDecoderConfig`] the codec should be
//! built with.
//!
//! A failed handshake produces no response — the caller decides whether to
//! close the connection or answer with `400 Bad Request`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use buffer::BufAllocator;
use digest::Digest;
use http::{FullRequest, FullResponse, HeaderMap, ResponseHead, StatusCode, names, values};
use sha1::Sha1;
use thiserror::Error;
use tracing::debug;

use crate::config::WebSocketDecoderConfig;

/// The fixed GUID every accept key is derived from (RFC 6455 §1.3).
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Errors raised while answering an opening handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The request carried no usable `Sec-WebSocket-Key`.
    #[error("missing or empty Sec-WebSocket-Key header")]
    MissingKey,
}

/// Server-side handshaker for protocol version 13.
#[derive(Clone, Debug)]
pub struct WebSocketServerHandshaker {
    subprotocols: Vec<String>,
    decoder_config: WebSocketDecoderConfig,
}

impl WebSocketServerHandshaker {
    /// Creates a handshaker supporting the given subprotocols. An entry of
    /// `"*"` accepts whatever the client offers first.
    pub fn new<I, S>(subprotocols: I, decoder_config: WebSocketDecoderConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subprotocols: subprotocols.into_iter().map(Into::into).collect(),
            decoder_config,
        }
    }

    /// The configuration the wire-level frame decoder should be built with.
    #[must_use]
    pub const fn decoder_config(&self) -> &WebSocketDecoderConfig {
        &self.decoder_config
    }

    /// Computes `Sec-WebSocket-Accept` for a client key.
    #[must_use]
    pub fn accept_key(key: &str) -> String {
        let mut seed = String::with_capacity(key.len() + WEBSOCKET_GUID.len());
        seed.push_str(key);
        seed.push_str(WEBSOCKET_GUID);
        BASE64.encode(Sha1::digest(seed.as_bytes()))
    }

    /// Picks the subprotocol to echo from the client's offer, first match
    /// in offer order.
    #[must_use]
    pub fn select_subprotocol(&self, requested: &[&str]) -> Option<String> {
        for offer in requested {
            for supported in &self.subprotocols {
                if supported == "*" || supported == offer {
                    return Some((*offer).to_owned());
                }
            }
        }
        None
    }

    /// Builds the `101 Switching Protocols` response for `request`.
    ///
    /// `extra_headers` are merged first, in order; the handshake headers
    /// then overwrite any clashes. The response body is an empty buffer
    /// from `alloc`, the allocator serving the request's connection.
    ///
    /// # Errors
    ///
    /// [`HandshakeError::MissingKey`] when the request has no usable
    /// `Sec-WebSocket-Key`. No response is produced in that case.
    pub fn new_handshake_response(
        &self,
        request: &FullRequest,
        extra_headers: Option<&HeaderMap>,
        alloc: &BufAllocator,
    ) -> Result<FullResponse, HandshakeError> {
        let key = request
            .head
            .headers
            .get_str(names::SEC_WEBSOCKET_KEY)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(HandshakeError::MissingKey)?;
        let accept = Self::accept_key(key);

        let mut head = ResponseHead::new(StatusCode::SWITCHING_PROTOCOLS);
        if let Some(extra) = extra_headers {
            head.headers.extend_from(extra);
        }
        head.headers.set(names::UPGRADE, values::WEBSOCKET);
        head.headers.set(names::CONNECTION, values::UPGRADE);
        head.headers.set(names::SEC_WEBSOCKET_ACCEPT, accept);

        if let Some(offer) = request.head.headers.get_str(names::SEC_WEBSOCKET_PROTOCOL) {
            let requested: Vec<&str> = offer
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .collect();
            // An offer that is empty after parsing means no subprotocol was
            // requested; the header is simply omitted.
            if !requested.is_empty() {
                match self.select_subprotocol(&requested) {
                    Some(chosen) => {
                        head.headers.set(names::SEC_WEBSOCKET_PROTOCOL, chosen.as_str());
                    }
                    None => {
                        debug!(
                            offer = %offer,
                            supported = ?self.subprotocols,
                            "no matching websocket subprotocol"
                        );
                    }
                }
            }
        }

        Ok(FullResponse::new(head, alloc.empty()))
    }
}
