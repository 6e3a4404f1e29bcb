//! Events flowing from connection tasks into the dispatcher.

use std::sync::Arc;

use feedbus_messages::{Message, MessageError};

use crate::interactors::Interactor;

/// One item on the dispatcher's event queue.
///
/// Every connection task and the heartbeat timer feed the same queue, so the
/// dispatcher observes connects, traffic, and failures in a single total
/// order and can mutate the routing tables without locks.
#[derive(Debug)]
pub enum InteractorEvent {
    /// A connection finished its handshake and is ready to route.
    Connected(Arc<Interactor>),
    /// A message arrived. `source` is `None` for messages the distributor
    /// injects itself, such as heartbeats.
    Message {
        source: Option<Arc<Interactor>>,
        message: Message,
    },
    /// A connection's read or write loop failed.
    Error {
        interactor: Arc<Interactor>,
        error: MessageError,
    },
}
