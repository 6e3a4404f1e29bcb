//! Pluggable transport security for inbound connections.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// User name assigned to peers that present no credentials.
pub const ANONYMOUS_USER: &str = "anonymous";

/// A bidirectional byte stream the wire codec can drive.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// An accepted stream after the security layer has processed it.
pub type SecuredStream = Box<dyn AsyncStream>;

/// Upgrades accepted TCP connections and names the peer.
///
/// Implementations may wrap the stream (for example in TLS) and derive the
/// user name from presented credentials. The distributor treats the returned
/// name as the peer's identity for every role decision, so an implementation
/// that returns unverified names weakens the policy to advisory.
#[async_trait]
pub trait StreamSecurity: Send + Sync {
    /// Wrap `stream` and authenticate the peer at `peer`.
    async fn secure_inbound(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> io::Result<(SecuredStream, String)>;
}

/// Plain TCP with no authentication. Every peer becomes [`ANONYMOUS_USER`].
pub struct NullStreamSecurity;

#[async_trait]
impl StreamSecurity for NullStreamSecurity {
    async fn secure_inbound(
        &self,
        stream: TcpStream,
        _peer: SocketAddr,
    ) -> io::Result<(SecuredStream, String)> {
        Ok((Box::new(stream), ANONYMOUS_USER.to_string()))
    }
}
