//! The routing orchestrator: subscriptions, monitors, and data flow.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use feedbus_messages::{DataPacket, FeedTopic, Message};

use crate::interactors::{AuthorizationOutcome, Interactor, InteractorManager};
use crate::notifiers::NotificationManager;
use crate::publishers::PublisherManager;
use crate::roles::Role;
use crate::subscribers::{AuthorizationInfo, SubscriptionRepository};

/// Owns the subscription tables and coordinates the sibling managers.
///
/// The dispatcher owns one of each manager and passes the siblings in per
/// call, so the whole routing state lives on a single task.
pub(crate) struct SubscriptionManager {
    repository: SubscriptionRepository,
}

impl SubscriptionManager {
    pub(crate) fn new() -> Self {
        Self {
            repository: SubscriptionRepository::new(),
        }
    }

    /// Handle a client's subscribe or unsubscribe.
    ///
    /// Adds do not touch the table yet; they go through authorization and
    /// only install on acceptance. Removes take effect immediately.
    pub(crate) fn request_subscription(
        &mut self,
        subscriber: &Arc<Interactor>,
        feed: String,
        topic: String,
        is_add: bool,
        interactors: &InteractorManager,
        notifications: &NotificationManager,
    ) {
        if !subscriber.has_role(&feed, Role::Subscribe) {
            warn!(subscriber = %subscriber, feed, "rejected request to subscribe");
            return;
        }

        debug!(subscriber = %subscriber, feed, topic, is_add, "received subscription request");

        if is_add {
            match interactors.request_authorization(subscriber, &feed, &topic) {
                AuthorizationOutcome::NotRequired => {
                    self.install(subscriber, &feed, &topic, AuthorizationInfo::open(), notifications);
                }
                AuthorizationOutcome::Requested => {}
            }
        } else {
            self.repository.remove_subscription(subscriber, &feed, &topic, false);
            notifications.forward_subscription(subscriber, &feed, &topic, false);
        }
    }

    /// Handle a monitor add or remove for a whole feed.
    ///
    /// Feeds that require authorization cannot be monitored; a monitor
    /// bypasses per-topic entitlements by construction.
    pub(crate) fn request_monitor(
        &mut self,
        monitor: &Arc<Interactor>,
        feed: String,
        is_add: bool,
        interactors: &InteractorManager,
    ) {
        if !monitor.has_role(&feed, Role::Subscribe) {
            warn!(monitor = %monitor, feed, "rejected request to monitor");
            return;
        }
        if interactors.is_authorization_required(&feed) {
            warn!(monitor = %monitor, feed, "rejected monitor request on an authorized feed");
            return;
        }

        debug!(monitor = %monitor, feed, is_add, "received monitor request");

        if is_add {
            self.repository.add_monitor(monitor, &feed);
        } else {
            self.repository.remove_monitor(monitor, &feed, false);
        }
    }

    /// Handle an authorizer's verdict on a pending subscription.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn accept_authorization(
        &mut self,
        authorizer: &Arc<Interactor>,
        client_id: Uuid,
        feed: String,
        topic: String,
        is_authorization_required: bool,
        entitlements: Option<Vec<Uuid>>,
        interactors: &InteractorManager,
        notifications: &NotificationManager,
    ) {
        debug!(authorizer = %authorizer, feed, topic, "accepting authorization response");

        let Some(requester) = interactors.find(client_id) else {
            warn!(%client_id, feed, topic, "authorization response for an unknown requester");
            return;
        };

        let entitlements = entitlements.unwrap_or_default();
        if is_authorization_required && entitlements.is_empty() {
            // Authorized to nothing: answer with one empty image and leave
            // the requester unsubscribed.
            let message = Message::ForwardedMulticastData {
                user: String::new(),
                address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                feed,
                topic,
                is_image: true,
                data: None,
            };
            if let Err(error) = requester.send(message) {
                debug!(requester = %requester, %error, "failed to send empty image");
            }
            return;
        }

        let authorization = if is_authorization_required {
            AuthorizationInfo::entitled(entitlements.into_iter().collect())
        } else {
            AuthorizationInfo::open()
        };
        self.install(&requester, &feed, &topic, authorization, notifications);
    }

    fn install(
        &mut self,
        subscriber: &Arc<Interactor>,
        feed: &str,
        topic: &str,
        authorization: AuthorizationInfo,
        notifications: &NotificationManager,
    ) {
        self.repository.add_subscription(subscriber, feed, topic, authorization);
        notifications.forward_subscription(subscriber, feed, topic, true);
    }

    /// Route directed data to the one subscriber with the target client id.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn send_unicast_data(
        &mut self,
        publisher: &Arc<Interactor>,
        client_id: Uuid,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
        publishers: &mut PublisherManager,
    ) {
        let recipient = self
            .repository
            .subscribers_to(&feed, &topic)
            .into_iter()
            .find(|(subscriber, _)| subscriber.id() == client_id);

        // A departed or never-subscribed target is not an error.
        let Some((subscriber, authorization)) = recipient else {
            return;
        };

        publishers.send_unicast_data(
            publisher,
            &subscriber,
            &authorization,
            client_id,
            feed,
            topic,
            is_image,
            data,
        );
    }

    /// Route broadcast data to everyone subscribed to (feed, topic).
    pub(crate) fn send_multicast_data(
        &mut self,
        publisher: Option<&Arc<Interactor>>,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
        publishers: &mut PublisherManager,
    ) {
        let subscribers = self.repository.subscribers_to(&feed, &topic);
        publishers.send_multicast_data(publisher, subscribers, feed, topic, is_image, data);
    }

    /// Bring a newly registered notifiable up to date with the feed's
    /// current subscriptions.
    pub(crate) fn backfill_notifiable(&self, notifiable: &Arc<Interactor>, feed: &str) {
        for (topic, subscribers) in self.repository.subscribers_to_feed(feed) {
            for subscriber in subscribers {
                let message = Message::ForwardedSubscriptionRequest {
                    user: subscriber.user().to_string(),
                    address: subscriber.address(),
                    client_id: subscriber.id(),
                    feed: feed.to_string(),
                    topic: topic.clone(),
                    is_add: true,
                };
                if let Err(error) = notifiable.send(message) {
                    debug!(notifiable = %notifiable, %error, "failed to backfill notifiable");
                }
            }
        }
    }

    /// Disconnect cascade: tear down everything the interactor held and
    /// tell the notifiables its subscriptions are gone.
    pub(crate) fn close_interactor(
        &mut self,
        interactor: &Arc<Interactor>,
        notifications: &NotificationManager,
        publishers: &mut PublisherManager,
    ) {
        debug!(interactor = %interactor, "removing subscriptions");

        let feed_topics = self.repository.find_by_interactor(interactor);
        for feed_topic in &feed_topics {
            self.repository
                .remove_subscription(interactor, &feed_topic.feed, &feed_topic.topic, true);
        }

        for feed in self.repository.find_monitored_feeds(interactor) {
            self.repository.remove_monitor(interactor, &feed, true);
        }

        for feed_topic in &feed_topics {
            notifications.forward_subscription(interactor, &feed_topic.feed, &feed_topic.topic, false);
        }

        let stale = publishers.close_interactor(interactor);
        self.send_stale_images(&stale);
    }

    /// One "image, no data" per subscriber of each now-unpublished topic.
    pub(crate) fn send_stale_images(&self, stale: &[FeedTopic]) {
        for feed_topic in stale {
            let message = Message::ForwardedMulticastData {
                user: String::new(),
                address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                feed: feed_topic.feed.clone(),
                topic: feed_topic.topic.clone(),
                is_image: true,
                data: None,
            };
            for (subscriber, _) in self.repository.subscribers_to(&feed_topic.feed, &feed_topic.topic)
            {
                if let Err(error) = subscriber.send(message.clone()) {
                    debug!(subscriber = %subscriber, %error, "failed to send stale image");
                }
            }
        }
    }
}
