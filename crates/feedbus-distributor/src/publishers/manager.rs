//! Outbound data distribution: role checks, filtering, wrapping.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use feedbus_messages::{DataPacket, FeedTopic, Message, INTERNAL_USER};

use crate::interactors::Interactor;
use crate::publishers::PublisherRepository;
use crate::roles::Role;
use crate::subscribers::AuthorizationInfo;

/// Turns publishes into Forwarded* deliveries and tracks who publishes what.
///
/// Subscribers only ever see the forwarded forms, which carry the
/// publisher's identity. Internal publishes (heartbeats) have no publisher;
/// they skip the role check and are attributed to [`INTERNAL_USER`] at an
/// unspecified address.
pub(crate) struct PublisherManager {
    repository: PublisherRepository,
}

impl PublisherManager {
    pub(crate) fn new() -> Self {
        Self {
            repository: PublisherRepository::new(),
        }
    }

    /// Deliver directed data to one subscriber.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn send_unicast_data(
        &mut self,
        publisher: &Arc<Interactor>,
        subscriber: &Arc<Interactor>,
        authorization: &AuthorizationInfo,
        client_id: Uuid,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    ) {
        if !publisher.has_role(&feed, Role::Publish) {
            warn!(publisher = %publisher, feed, "rejected request to publish");
            return;
        }

        let message = Message::ForwardedUnicastData {
            user: publisher.user().to_string(),
            address: publisher.address(),
            client_id,
            feed: feed.clone(),
            topic: topic.clone(),
            is_image,
            data: authorization.filter(data.as_deref()),
        };

        debug!(publisher = %publisher, subscriber = %subscriber, feed, topic, "sending unicast data");
        self.repository.add_publisher(publisher, &FeedTopic::new(feed, topic));

        if let Err(error) = subscriber.send(message) {
            debug!(subscriber = %subscriber, %error, "failed to send unicast data");
        }
    }

    /// Fan broadcast data out to the topic's subscribers.
    pub(crate) fn send_multicast_data(
        &mut self,
        publisher: Option<&Arc<Interactor>>,
        subscribers: Vec<(Arc<Interactor>, AuthorizationInfo)>,
        feed: String,
        topic: String,
        is_image: bool,
        data: Option<Vec<DataPacket>>,
    ) {
        if let Some(publisher) = publisher {
            if !publisher.has_role(&feed, Role::Publish) {
                warn!(publisher = %publisher, feed, "rejected request to publish");
                return;
            }
            self.repository
                .add_publisher(publisher, &FeedTopic::new(feed.clone(), topic.clone()));
        }

        let (user, address) = match publisher {
            Some(publisher) => (publisher.user().to_string(), publisher.address()),
            None => (
                INTERNAL_USER.to_string(),
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            ),
        };

        for (subscriber, authorization) in subscribers {
            let message = Message::ForwardedMulticastData {
                user: user.clone(),
                address,
                feed: feed.clone(),
                topic: topic.clone(),
                is_image,
                data: authorization.filter(data.as_deref()),
            };
            if let Err(error) = subscriber.send(message) {
                debug!(subscriber = %subscriber, %error, "failed to send multicast data");
            }
        }
    }

    /// Forget a departing publisher; returns the topics it alone published.
    pub(crate) fn close_interactor(&mut self, interactor: &Arc<Interactor>) -> Vec<FeedTopic> {
        self.repository.remove_publisher(interactor)
    }
}
