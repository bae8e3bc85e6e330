//! WebSocket frame model (RFC 6455 §5).

use buffer::{BufAllocator, ByteBuf};
use pipeline::{Cause, ReferenceCounted};

/// Reserved bit 1, negotiated by extensions such as permessage-deflate.
pub const RSV1: u8 = 0b100;
/// Reserved bit 2.
pub const RSV2: u8 = 0b010;
/// Reserved bit 3.
pub const RSV3: u8 = 0b001;

/// Frame opcode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Opcode {
    /// Continues a fragmented text or binary message.
    Continuation,
    /// Text payload; the assembled message is expected to be valid UTF-8.
    Text,
    /// Binary payload.
    Binary,
    /// Control: ping.
    Ping,
    /// Control: pong.
    Pong,
    /// Control: close.
    Close,
}

impl Opcode {
    /// `true` for ping, pong, and close.
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Ping | Self::Pong | Self::Close)
    }

    /// Lowercase name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Continuation => "continuation",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Close => "close",
        }
    }
}

/// One WebSocket frame with its payload buffer.
#[derive(Debug)]
pub struct WebSocketFrame {
    /// Frame opcode.
    pub opcode: Opcode,
    /// `true` when this frame completes its message.
    pub final_fragment: bool,
    /// The three reserved bits, `0b100` = RSV1.
    pub rsv: u8,
    /// Payload buffer; the frame owns one reference.
    pub payload: ByteBuf,
}

impl WebSocketFrame {
    /// Creates a frame from its parts.
    #[must_use]
    pub fn new(opcode: Opcode, final_fragment: bool, rsv: u8, payload: ByteBuf) -> Self {
        Self {
            opcode,
            final_fragment,
            rsv,
            payload,
        }
    }

    /// A final, unextended text frame. The payload is expected to be UTF-8.
    #[must_use]
    pub fn text(payload: ByteBuf) -> Self {
        Self::new(Opcode::Text, true, 0, payload)
    }

    /// A final, unextended binary frame.
    #[must_use]
    pub fn binary(payload: ByteBuf) -> Self {
        Self::new(Opcode::Binary, true, 0, payload)
    }

    /// A continuation frame.
    #[must_use]
    pub fn continuation(final_fragment: bool, payload: ByteBuf) -> Self {
        Self::new(Opcode::Continuation, final_fragment, 0, payload)
    }

    /// A ping frame with an empty payload.
    #[must_use]
    pub fn ping(alloc: &BufAllocator) -> Self {
        Self::new(Opcode::Ping, true, 0, alloc.empty())
    }

    /// A pong frame with an empty payload.
    #[must_use]
    pub fn pong(alloc: &BufAllocator) -> Self {
        Self::new(Opcode::Pong, true, 0, alloc.empty())
    }

    /// A close frame with an empty payload.
    #[must_use]
    pub fn close(alloc: &BufAllocator) -> Self {
        Self::new(Opcode::Close, true, 0, alloc.empty())
    }
}

impl ReferenceCounted for WebSocketFrame {
    fn retain(&self) -> Result<(), Cause> {
        ReferenceCounted::retain(&self.payload)
    }

    fn release(&self) -> Result<bool, Cause> {
        ReferenceCounted::release(&self.payload)
    }

    fn ref_count(&self) -> usize {
        self.payload.ref_count()
    }
}
