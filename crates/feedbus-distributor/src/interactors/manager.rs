//! Connection lifecycle: open, close, advertisements, authorization fan-out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use feedbus_messages::Message;

use crate::events::InteractorEvent;
use crate::interactors::{Interactor, InteractorRepository};
use crate::roles::{DistributorRole, Role};

/// What [`InteractorManager::request_authorization`] did with a request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AuthorizationOutcome {
    /// The feed carries no role configuration; grant immediately.
    NotRequired,
    /// The request went out to the feed's authorizers. A response arrives
    /// later as an `AuthorizationResponse` message, if at all.
    Requested,
}

/// Owns the connection table and everything that touches all connections.
pub(crate) struct InteractorManager {
    repository: InteractorRepository,
    advertise: bool,
}

impl InteractorManager {
    pub(crate) fn new(policy: Arc<DistributorRole>, advertise: bool) -> Self {
        Self {
            repository: InteractorRepository::new(policy),
            advertise,
        }
    }

    pub(crate) fn policy(&self) -> &Arc<DistributorRole> {
        self.repository.policy()
    }

    pub(crate) fn find(&self, id: Uuid) -> Option<Arc<Interactor>> {
        self.repository.find(id)
    }

    pub(crate) fn is_authorization_required(&self, feed: &str) -> bool {
        self.repository.policy().is_authorization_required(feed)
    }

    /// Admit a new connection and start its socket loops.
    ///
    /// When advertising is on, existing connections learn about the newcomer
    /// before it joins the table, and the newcomer receives one joining
    /// advertisement per connection present before it.
    pub(crate) fn open(
        &mut self,
        interactor: Arc<Interactor>,
        event_tx: &mpsc::UnboundedSender<InteractorEvent>,
    ) {
        debug!(interactor = %interactor, "opening interactor");

        let mut snapshot = Vec::new();
        if self.advertise {
            let join = Message::InteractorAdvertisement {
                user: interactor.user().to_string(),
                address: interactor.address(),
                is_joining: true,
            };
            for existing in self.repository.iter() {
                if let Err(error) = existing.send(join.clone()) {
                    warn!(recipient = %existing, %error, "failed to send advertisement");
                }
                snapshot.push(Message::InteractorAdvertisement {
                    user: existing.user().to_string(),
                    address: existing.address(),
                    is_joining: true,
                });
            }
        }

        self.repository.add(Arc::clone(&interactor));
        interactor.start(event_tx.clone());

        for message in snapshot {
            if let Err(error) = interactor.send(message) {
                warn!(recipient = %interactor, %error, "failed to send advertisement snapshot");
            }
        }
    }

    /// Remove a connection from the table and advertise its departure.
    ///
    /// Returns `None` when the connection was already removed, which happens
    /// when the read and write loops both report a failure.
    pub(crate) fn close(&mut self, id: Uuid) -> Option<Arc<Interactor>> {
        let interactor = self.repository.remove(id)?;
        debug!(interactor = %interactor, "closing interactor");

        if self.advertise {
            let leave = Message::InteractorAdvertisement {
                user: interactor.user().to_string(),
                address: interactor.address(),
                is_joining: false,
            };
            for existing in self.repository.iter() {
                if let Err(error) = existing.send(leave.clone()) {
                    warn!(recipient = %existing, %error, "failed to send advertisement");
                }
            }
        }

        Some(interactor)
    }

    /// Ask the feed's authorizers to entitle a subscription, if the feed is
    /// configured to require it.
    pub(crate) fn request_authorization(
        &self,
        interactor: &Arc<Interactor>,
        feed: &str,
        topic: &str,
    ) -> AuthorizationOutcome {
        debug!(interactor = %interactor, feed, topic, "requesting authorization");

        if !self.is_authorization_required(feed) {
            debug!(feed, "no authorization required");
            return AuthorizationOutcome::NotRequired;
        }

        let request = Message::AuthorizationRequest {
            client_id: interactor.id(),
            address: interactor.address(),
            user: interactor.user().to_string(),
            feed: feed.to_string(),
            topic: topic.to_string(),
        };
        for authorizer in self.repository.find_feed_role(feed, Role::Authorize) {
            debug!(authorizer = %authorizer, "forwarding authorization request");
            if let Err(error) = authorizer.send(request.clone()) {
                warn!(authorizer = %authorizer, %error, "failed to send authorization request");
            }
        }

        AuthorizationOutcome::Requested
    }

    /// Dispose every connection, for shutdown.
    pub(crate) fn shutdown(&mut self) {
        for interactor in self.repository.drain() {
            interactor.dispose();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.repository.len()
    }
}
