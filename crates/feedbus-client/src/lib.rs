//! # feedbus-client
//!
//! The asynchronous client adapter for a feedbus distributor. One
//! [`Client`] owns one connection: control calls (subscribe, publish,
//! notify, authorize) enqueue without blocking, and everything inbound
//! arrives as [`ClientEvent`]s on a stream.
//!
//! ```no_run
//! use feedbus_client::{Client, ClientConfig, ClientEvent};
//! use tokio_stream::StreamExt;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (client, mut events) = Client::connect(
//!     "127.0.0.1:9090".parse()?,
//!     ClientConfig::default(),
//! )
//! .await?;
//!
//! client.add_subscription("PUB", "GBPUSD")?;
//! while let Some(event) = events.next().await {
//!     if let ClientEvent::Data { topic, data, .. } = event {
//!         println!("{topic}: {data:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Payload bodies are opaque bytes on the wire; the [`encoders`] module
//! holds the JSON and binary codecs applications usually agree on.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod client;
pub mod encoders;
pub mod error;

pub use client::{Client, ClientConfig, ClientEvent, ClientEventStream, ConnectionState};
pub use encoders::{BinaryByteEncoder, ByteEncoder, JsonByteEncoder};
pub use error::{ClientError, EncodeError};
