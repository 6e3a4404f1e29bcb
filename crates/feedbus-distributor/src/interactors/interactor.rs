//! One connected client: identity, role cache, and the two socket loops.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};
use uuid::Uuid;

use feedbus_messages::{Message, MessageError};

use crate::error::DistributorError;
use crate::events::InteractorEvent;
use crate::interactors::SecuredStream;
use crate::roles::{DistributorRole, Role};

/// A connected client.
///
/// The dispatcher holds interactors in its routing tables and talks to them
/// only through [`Interactor::send`], which enqueues onto the connection's
/// write queue. The read and write loops run as separate tasks; a failure in
/// either surfaces as an [`InteractorEvent::Error`] so the dispatcher can
/// tear the connection down exactly once.
pub struct Interactor {
    id: Uuid,
    user: String,
    address: IpAddr,
    outbound: OutboundQueue,
    policy: Arc<DistributorRole>,
    role_cache: Mutex<HashMap<String, HashMap<Role, bool>>>,
    close_tx: watch::Sender<bool>,
    parts: Mutex<Option<LoopParts>>,
}

/// Everything the socket loops consume when the interactor starts.
struct LoopParts {
    reader: ReadHalf<SecuredStream>,
    writer: WriteHalf<SecuredStream>,
    outbound_rx: OutboundReceiver,
    close_rx: watch::Receiver<bool>,
}

enum OutboundQueue {
    Unbounded(mpsc::UnboundedSender<Message>),
    Bounded(mpsc::Sender<Message>),
}

enum OutboundReceiver {
    Unbounded(mpsc::UnboundedReceiver<Message>),
    Bounded(mpsc::Receiver<Message>),
}

impl OutboundReceiver {
    async fn recv(&mut self) -> Option<Message> {
        match self {
            OutboundReceiver::Unbounded(rx) => rx.recv().await,
            OutboundReceiver::Bounded(rx) => rx.recv().await,
        }
    }
}

impl Interactor {
    /// Wrap a secured stream in a new interactor.
    ///
    /// `write_queue_capacity` of 0 gives an unbounded write queue. The
    /// socket loops do not run until [`Interactor::start`] is called.
    #[must_use]
    pub fn attach(
        stream: SecuredStream,
        address: IpAddr,
        user: String,
        policy: Arc<DistributorRole>,
        write_queue_capacity: usize,
    ) -> Arc<Interactor> {
        let (reader, writer) = tokio::io::split(stream);
        let (outbound, outbound_rx) = if write_queue_capacity == 0 {
            let (tx, rx) = mpsc::unbounded_channel();
            (OutboundQueue::Unbounded(tx), OutboundReceiver::Unbounded(rx))
        } else {
            let (tx, rx) = mpsc::channel(write_queue_capacity);
            (OutboundQueue::Bounded(tx), OutboundReceiver::Bounded(rx))
        };
        let (close_tx, close_rx) = watch::channel(false);

        Arc::new(Interactor {
            id: Uuid::new_v4(),
            user,
            address,
            outbound,
            policy,
            role_cache: Mutex::new(HashMap::new()),
            close_tx,
            parts: Mutex::new(Some(LoopParts {
                reader,
                writer,
                outbound_rx,
                close_rx,
            })),
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Spawn the read and write loops. Idempotent; later calls do nothing.
    pub fn start(self: &Arc<Self>, event_tx: mpsc::UnboundedSender<InteractorEvent>) {
        let Some(parts) = self.parts.lock().take() else {
            debug!(interactor = %self, "already started");
            return;
        };
        let LoopParts {
            reader,
            writer,
            outbound_rx,
            close_rx,
        } = parts;
        tokio::spawn(Arc::clone(self).read_loop(reader, event_tx.clone(), close_rx.clone()));
        tokio::spawn(Arc::clone(self).write_loop(writer, outbound_rx, close_rx, event_tx));
    }

    /// Enqueue a message for delivery to this client.
    ///
    /// Does not wait for the socket. A full bounded queue drops the message
    /// for this recipient only; other recipients are unaffected.
    pub fn send(&self, message: Message) -> Result<(), DistributorError> {
        match &self.outbound {
            OutboundQueue::Unbounded(tx) => tx
                .send(message)
                .map_err(|_| DistributorError::Disconnected { id: self.id }),
            OutboundQueue::Bounded(tx) => tx.try_send(message).map_err(|err| match err {
                TrySendError::Full(_) => DistributorError::WriteQueueFull { id: self.id },
                TrySendError::Closed(_) => DistributorError::Disconnected { id: self.id },
            }),
        }
    }

    /// Stop both socket loops and release the stream. Idempotent.
    pub fn dispose(&self) {
        let _ = self.close_tx.send(true);
        drop(self.parts.lock().take());
    }

    /// Whether this client holds `role` on `feed`.
    ///
    /// The policy is immutable, so decisions are memoized per feed.
    #[must_use]
    pub fn has_role(&self, feed: &str, role: Role) -> bool {
        let mut cache = self.role_cache.lock();
        if let Some(decision) = cache.get(feed).and_then(|by_role| by_role.get(&role)) {
            return *decision;
        }
        let decision = self.policy.has_role(self.address, &self.user, feed, role);
        cache.entry(feed.to_string()).or_default().insert(role, decision);
        decision
    }

    async fn read_loop(
        self: Arc<Self>,
        mut reader: ReadHalf<SecuredStream>,
        event_tx: mpsc::UnboundedSender<InteractorEvent>,
        mut close_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = close_rx.changed() => break,
                result = Message::read(&mut reader) => match result {
                    Ok(message) => {
                        trace!(interactor = %self, kind = ?message.kind(), "received");
                        let event = InteractorEvent::Message {
                            source: Some(Arc::clone(&self)),
                            message,
                        };
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        let _ = event_tx.send(InteractorEvent::Error {
                            interactor: Arc::clone(&self),
                            error,
                        });
                        break;
                    }
                },
            }
        }
    }

    async fn write_loop(
        self: Arc<Self>,
        writer: WriteHalf<SecuredStream>,
        mut outbound_rx: OutboundReceiver,
        mut close_rx: watch::Receiver<bool>,
        event_tx: mpsc::UnboundedSender<InteractorEvent>,
    ) {
        let mut writer = BufWriter::new(writer);
        loop {
            tokio::select! {
                _ = close_rx.changed() => break,
                maybe_message = outbound_rx.recv() => {
                    let Some(message) = maybe_message else { break };
                    let result = tokio::select! {
                        _ = close_rx.changed() => break,
                        result = write_one(&mut writer, &message) => result,
                    };
                    if let Err(error) = result {
                        let _ = event_tx.send(InteractorEvent::Error {
                            interactor: Arc::clone(&self),
                            error,
                        });
                        break;
                    }
                }
            }
        }
        let _ = writer.shutdown().await;
    }
}

async fn write_one(
    writer: &mut BufWriter<WriteHalf<SecuredStream>>,
    message: &Message,
) -> Result<(), MessageError> {
    message.write(writer).await?;
    writer.flush().await?;
    Ok(())
}

impl fmt::Debug for Interactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interactor")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Interactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}@{}", self.id, self.user, self.address)
    }
}

impl PartialEq for Interactor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Interactor {}

impl std::hash::Hash for Interactor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Interactor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interactor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
