//! # feedbus-distributor
//!
//! The hub of the bus: a TCP server that accepts client connections,
//! tracks who subscribes to what, and routes published data to the
//! interested parties.
//!
//! ## Architecture
//!
//! ```text
//!             ┌──────────────────────────────────────────────┐
//!             │                 distributor                  │
//!             │                                              │
//!  client ────┼─▶ read task ──┐                              │
//!  client ────┼─▶ read task ──┼─▶ event queue ─▶ dispatcher  │
//!  client ────┼─▶ read task ──┘        ▲        (all state)  │
//!             │                        │             │       │
//!             │                   heartbeat          ▼       │
//!             │                     timer       write queues │
//!             └──────────────────────────────────────────────┘
//! ```
//!
//! Every connection gets a read task and a write task. Read tasks do no
//! routing; they decode messages and push them onto one queue. A single
//! dispatcher task consumes that queue and owns every routing table, so
//! state needs no locks and events apply in one total order. Outbound
//! messages go through per-connection write queues so one slow consumer
//! cannot stall the dispatcher.
//!
//! ## Policy
//!
//! Access control is a role chain: a distributor-wide default, overridden
//! per feed, overridden per (address, user). The default configuration
//! allows everything, which turns the distributor into a plain open bus.
//! A feed with a configured role additionally puts its subscriptions
//! through an authorization round-trip with an authorizer client, whose
//! entitlement grants filter the data each subscriber may see.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
mod dispatcher;
pub mod error;
pub mod events;
pub mod interactors;
mod notifiers;
mod publishers;
pub mod roles;
pub mod server;
mod subscribers;

pub use config::{ConfigError, DistributorConfig};
pub use error::DistributorError;
pub use events::InteractorEvent;
pub use interactors::{
    Interactor, NullStreamSecurity, SecuredStream, StreamSecurity, ANONYMOUS_USER,
};
pub use roles::{DistributorRole, FeedRole, InteractorRole, Role, RoleSet};
pub use server::Server;
