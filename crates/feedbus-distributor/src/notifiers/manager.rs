//! Subscription-churn forwarding to each feed's notifiables.

use std::sync::Arc;

use tracing::debug;

use feedbus_messages::Message;

use crate::interactors::Interactor;
use crate::notifiers::NotificationRepository;

pub(crate) struct NotificationManager {
    repository: NotificationRepository,
}

impl NotificationManager {
    pub(crate) fn new() -> Self {
        Self {
            repository: NotificationRepository::new(),
        }
    }

    /// Register or withdraw interest in a feed's subscription churn.
    ///
    /// Returns true when this was the notifiable's first registration for
    /// the feed, which is the moment the caller backfills it with the
    /// feed's current subscriptions.
    pub(crate) fn request_notification(
        &mut self,
        notifiable: &Arc<Interactor>,
        feed: &str,
        is_add: bool,
    ) -> bool {
        debug!(notifiable = %notifiable, feed, is_add, "handling notification request");
        if is_add {
            self.repository.add_request(notifiable, feed)
        } else {
            self.repository.remove_request(notifiable, feed, false);
            false
        }
    }

    /// Tell the feed's notifiables that `subscriber` added or dropped a
    /// subscription on (feed, topic).
    pub(crate) fn forward_subscription(
        &self,
        subscriber: &Arc<Interactor>,
        feed: &str,
        topic: &str,
        is_add: bool,
    ) {
        let notifiables = self.repository.find_notifiables(feed);
        if notifiables.is_empty() {
            return;
        }

        let message = Message::ForwardedSubscriptionRequest {
            user: subscriber.user().to_string(),
            address: subscriber.address(),
            client_id: subscriber.id(),
            feed: feed.to_string(),
            topic: topic.to_string(),
            is_add,
        };
        debug!(feed, topic, is_add, notifiables = notifiables.len(), "forwarding subscription");

        for notifiable in notifiables {
            if let Err(error) = notifiable.send(message.clone()) {
                debug!(notifiable = %notifiable, %error, "failed to forward subscription");
            }
        }
    }

    pub(crate) fn close_interactor(&mut self, interactor: &Arc<Interactor>) {
        debug!(interactor = %interactor, "removing notification requests");
        self.repository.remove_interactor(interactor);
    }
}
