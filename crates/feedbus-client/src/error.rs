//! Client-side error types.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by [`crate::Client`] control calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The socket loops have stopped; the message was not enqueued.
    #[error("connection is closed")]
    Closed,
}

/// Errors from the payload byte encoders.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("json encoding failed")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding failed")]
    Binary(#[from] bincode::Error),
}
