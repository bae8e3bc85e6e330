use std::io;

use buffer::BufferError;
use thiserror::Error;

/// Errors raised by codec stages.
///
/// Codec failures travel through the pipeline's `exception_caught` path
/// rather than unwinding; the variants mirror the protocol violations the
/// HTTP and WebSocket stages can observe.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An HTTP object violated the message contract of the decoder stage.
    #[error("invalid http message: {0}")]
    InvalidHttpMessage(String),

    /// The first frame of a message had an opcode that cannot start one.
    #[error("unexpected initial frame type: {0}")]
    UnexpectedInitialFrameType(&'static str),

    /// A frame had an opcode the decoder cannot produce a replacement for.
    #[error("unexpected frame type: {0}")]
    UnexpectedFrameType(&'static str),

    /// The inflater consumed a non-empty payload but produced nothing.
    #[error("cannot read uncompressed buffer")]
    CannotReadUncompressed,

    /// The underlying inflate stream reported corruption.
    #[error("decompression failed")]
    Decompression(#[source] io::Error),

    /// A buffer operation failed inside the codec.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}
