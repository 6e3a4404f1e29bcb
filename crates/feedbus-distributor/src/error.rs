//! Distributor error types.

use std::net::SocketAddr;

use thiserror::Error;
use uuid::Uuid;

pub use crate::config::ConfigError;

/// Errors surfaced by the distributor's public API.
///
/// Per-connection protocol failures never appear here; they terminate the
/// affected interactor and are handled inside the event loop.
#[derive(Debug, Error)]
pub enum DistributorError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A message was enqueued for an interactor whose loops have ended.
    #[error("interactor {id} is disconnected")]
    Disconnected { id: Uuid },

    /// A bounded write queue was full. The message is dropped for this
    /// recipient only.
    #[error("write queue full for interactor {id}")]
    WriteQueueFull { id: Uuid },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O failure outside any single connection.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
