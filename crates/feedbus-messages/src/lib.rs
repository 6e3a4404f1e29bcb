//! # feedbus-messages
//!
//! The binary wire protocol spoken between the feedbus distributor and its
//! clients. One crate, no routing logic: message kinds, their byte-exact
//! encodings, and the small value types they carry.
//!
//! ## Shape of the protocol
//!
//! A connection is an unframed stream of self-describing messages: one tag
//! byte selects the kind, the body follows field by field. There is no outer
//! length prefix, so decoding is streaming and stateless between messages.
//! A peer that disconnects on a tag boundary closed cleanly; a peer that
//! disconnects mid-body, or sends an unknown tag, faulted.
//!
//! Round-trip fidelity is the crate's hard contract: for every kind,
//! `read(write(m)) == m`, including the boundary cases (empty strings,
//! absent data arrays, zero entitlements).

pub mod data_packet;
pub mod error;
pub mod feed_topic;
pub mod io;
pub mod message;

pub use data_packet::DataPacket;
pub use error::MessageError;
pub use feed_topic::FeedTopic;
pub use message::{Message, MessageKind};

/// Feed reserved for distributor housekeeping traffic.
pub const ADMIN_FEED: &str = "__admin__";

/// Topic carrying heartbeats on the admin feed.
pub const HEARTBEAT_TOPIC: &str = "heartbeat";

/// Publisher name stamped on distributor-originated multicasts.
pub const INTERNAL_USER: &str = "internal";
