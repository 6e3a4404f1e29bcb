//! The event loop core: one task, all routing state, no locks.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use feedbus_messages::Message;

use crate::events::InteractorEvent;
use crate::interactors::{Interactor, InteractorManager};
use crate::notifiers::NotificationManager;
use crate::publishers::PublisherManager;
use crate::roles::DistributorRole;
use crate::subscribers::SubscriptionManager;

/// Consumes the event queue and applies every state change in arrival order.
///
/// Connection tasks and the heartbeat timer only ever enqueue; this task is
/// the sole owner of the routing tables, so handlers borrow the sibling
/// managers directly and never contend.
pub(crate) struct Dispatcher {
    interactors: InteractorManager,
    subscriptions: SubscriptionManager,
    notifications: NotificationManager,
    publishers: PublisherManager,
    event_tx: mpsc::UnboundedSender<InteractorEvent>,
}

impl Dispatcher {
    pub(crate) fn new(
        policy: Arc<DistributorRole>,
        advertise: bool,
    ) -> (Self, mpsc::UnboundedReceiver<InteractorEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            interactors: InteractorManager::new(policy, advertise),
            subscriptions: SubscriptionManager::new(),
            notifications: NotificationManager::new(),
            publishers: PublisherManager::new(),
            event_tx,
        };
        (dispatcher, event_rx)
    }

    /// A handle for producers: the accept loop and the heartbeat timer.
    pub(crate) fn event_tx(&self) -> mpsc::UnboundedSender<InteractorEvent> {
        self.event_tx.clone()
    }

    /// Drain events until shutdown, then dispose every connection.
    pub(crate) async fn run(
        mut self,
        mut event_rx: mpsc::UnboundedReceiver<InteractorEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                maybe_event = event_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    self.handle_event(event);
                }
            }
        }
        info!("dispatcher stopping");
        self.interactors.shutdown();
    }

    fn handle_event(&mut self, event: InteractorEvent) {
        match event {
            InteractorEvent::Connected(interactor) => {
                self.interactors.open(interactor, &self.event_tx);
            }
            InteractorEvent::Message { source, message } => self.handle_message(source, message),
            InteractorEvent::Error { interactor, error } => {
                if error.is_end_of_stream() {
                    debug!(interactor = %interactor, "interactor closed");
                } else {
                    warn!(interactor = %interactor, %error, "interactor faulted");
                }
                self.close_interactor(&interactor);
            }
        }
    }

    fn handle_message(&mut self, source: Option<Arc<Interactor>>, message: Message) {
        match (source, message) {
            (
                source,
                Message::MulticastData {
                    feed,
                    topic,
                    is_image,
                    data,
                },
            ) => {
                self.subscriptions.send_multicast_data(
                    source.as_ref(),
                    feed,
                    topic,
                    is_image,
                    data,
                    &mut self.publishers,
                );
            }
            (
                Some(source),
                Message::UnicastData {
                    client_id,
                    feed,
                    topic,
                    is_image,
                    data,
                },
            ) => {
                self.subscriptions.send_unicast_data(
                    &source,
                    client_id,
                    feed,
                    topic,
                    is_image,
                    data,
                    &mut self.publishers,
                );
            }
            (Some(source), Message::SubscriptionRequest { feed, topic, is_add }) => {
                self.subscriptions.request_subscription(
                    &source,
                    feed,
                    topic,
                    is_add,
                    &self.interactors,
                    &self.notifications,
                );
            }
            (Some(source), Message::MonitorRequest { feed, is_add }) => {
                self.subscriptions
                    .request_monitor(&source, feed, is_add, &self.interactors);
            }
            (Some(source), Message::NotificationRequest { feed, is_add }) => {
                if self.notifications.request_notification(&source, &feed, is_add) {
                    self.subscriptions.backfill_notifiable(&source, &feed);
                }
            }
            (
                Some(source),
                Message::AuthorizationResponse {
                    client_id,
                    feed,
                    topic,
                    is_authorization_required,
                    entitlements,
                },
            ) => {
                self.subscriptions.accept_authorization(
                    &source,
                    client_id,
                    feed,
                    topic,
                    is_authorization_required,
                    entitlements,
                    &self.interactors,
                    &self.notifications,
                );
            }
            (source, message) => {
                warn!(
                    source = ?source.map(|interactor| interactor.id()),
                    kind = ?message.kind(),
                    "unhandled message",
                );
            }
        }
    }

    fn close_interactor(&mut self, interactor: &Arc<Interactor>) {
        interactor.dispose();
        // Both socket loops report failures; only the first teardown runs.
        let Some(interactor) = self.interactors.close(interactor.id()) else {
            return;
        };
        self.notifications.close_interactor(&interactor);
        self.subscriptions
            .close_interactor(&interactor, &self.notifications, &mut self.publishers);
    }
}
