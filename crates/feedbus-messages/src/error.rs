//! Decode and encode failures for the wire protocol.

use thiserror::Error;

/// Errors raised while reading or writing protocol messages.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The stream ended exactly on a message boundary. This is a graceful
    /// close, not a fault.
    #[error("end of stream")]
    EndOfStream,

    /// The leading tag byte named no known message kind.
    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),

    /// A field violated the encoding rules (bad length prefix, non-UTF-8
    /// string, wrong block size).
    #[error("malformed message: {0}")]
    Malformed(&'static str),

    /// The underlying stream failed mid-message.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MessageError {
    /// True only for the graceful end-of-stream case. Everything else is a
    /// protocol fault for the connection that produced it.
    #[must_use]
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, MessageError::EndOfStream)
    }
}
