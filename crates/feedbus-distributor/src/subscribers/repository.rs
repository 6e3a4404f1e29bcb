//! The subscription and monitor tables.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use feedbus_messages::{DataPacket, FeedTopic};

use crate::interactors::Interactor;

/// How a subscription was authorized, fixed at installation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationInfo {
    /// Whether the feed required authorization when the subscription was made.
    pub is_authorization_required: bool,
    /// The packet headers this subscriber may see. Ignored when
    /// authorization was not required.
    pub entitlements: HashSet<Uuid>,
}

impl AuthorizationInfo {
    /// No authorization involved; the subscriber sees everything.
    #[must_use]
    pub fn open() -> Self {
        Self {
            is_authorization_required: false,
            entitlements: HashSet::new(),
        }
    }

    /// An authorized subscription limited to the given packet headers.
    #[must_use]
    pub fn entitled(entitlements: HashSet<Uuid>) -> Self {
        Self {
            is_authorization_required: true,
            entitlements,
        }
    }

    /// Restrict outbound packets to this subscriber's entitlements.
    #[must_use]
    pub fn filter(&self, data: Option<&[DataPacket]>) -> Option<Vec<DataPacket>> {
        match data {
            None => None,
            Some(packets) if self.is_authorization_required => Some(
                packets
                    .iter()
                    .filter(|packet| self.entitlements.contains(&packet.header))
                    .cloned()
                    .collect(),
            ),
            Some(packets) => Some(packets.to_vec()),
        }
    }
}

struct SubscriptionState {
    authorization: AuthorizationInfo,
    count: usize,
}

/// Who is subscribed to what.
///
/// Topic subscriptions are refcounted per (feed, topic, subscriber) and hold
/// the AuthorizationInfo fixed at first installation. Monitors are
/// refcounted per (feed, subscriber) and see every topic on the feed without
/// entitlement filtering. Empty maps are pruned eagerly so lookups never
/// touch dead feeds.
#[derive(Default)]
pub(crate) struct SubscriptionRepository {
    subscriptions: HashMap<String, HashMap<String, HashMap<Arc<Interactor>, SubscriptionState>>>,
    monitors: HashMap<String, HashMap<Arc<Interactor>, usize>>,
}

impl SubscriptionRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install or refcount a subscription. `authorization` is kept from the
    /// first installation only.
    pub(crate) fn add_subscription(
        &mut self,
        subscriber: &Arc<Interactor>,
        feed: &str,
        topic: &str,
        authorization: AuthorizationInfo,
    ) {
        let state = self
            .subscriptions
            .entry(feed.to_string())
            .or_default()
            .entry(topic.to_string())
            .or_default()
            .entry(Arc::clone(subscriber))
            .or_insert(SubscriptionState {
                authorization,
                count: 0,
            });
        state.count += 1;
    }

    /// Drop one reference, or the whole entry with `remove_all`.
    pub(crate) fn remove_subscription(
        &mut self,
        subscriber: &Arc<Interactor>,
        feed: &str,
        topic: &str,
        remove_all: bool,
    ) {
        let Some(topics) = self.subscriptions.get_mut(feed) else {
            return;
        };
        let Some(subscribers) = topics.get_mut(topic) else {
            return;
        };
        let Some(state) = subscribers.get_mut(subscriber) else {
            return;
        };

        state.count -= 1;
        if remove_all || state.count == 0 {
            subscribers.remove(subscriber);
        }
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        if topics.is_empty() {
            self.subscriptions.remove(feed);
        }
    }

    pub(crate) fn add_monitor(&mut self, monitor: &Arc<Interactor>, feed: &str) {
        let count = self
            .monitors
            .entry(feed.to_string())
            .or_default()
            .entry(Arc::clone(monitor))
            .or_insert(0);
        *count += 1;
    }

    pub(crate) fn remove_monitor(&mut self, monitor: &Arc<Interactor>, feed: &str, remove_all: bool) {
        let Some(feed_monitors) = self.monitors.get_mut(feed) else {
            return;
        };
        let Some(count) = feed_monitors.get_mut(monitor) else {
            return;
        };

        *count -= 1;
        if remove_all || *count == 0 {
            feed_monitors.remove(monitor);
        }
        if feed_monitors.is_empty() {
            self.monitors.remove(feed);
        }
    }

    /// Every (feed, topic) the interactor is subscribed to.
    pub(crate) fn find_by_interactor(&self, interactor: &Arc<Interactor>) -> Vec<FeedTopic> {
        self.subscriptions
            .iter()
            .flat_map(|(feed, topics)| {
                topics
                    .iter()
                    .filter(|(_, subscribers)| subscribers.contains_key(interactor))
                    .map(move |(topic, _)| FeedTopic::new(feed.clone(), topic.clone()))
            })
            .collect()
    }

    /// The feeds the interactor monitors.
    pub(crate) fn find_monitored_feeds(&self, interactor: &Arc<Interactor>) -> Vec<String> {
        self.monitors
            .iter()
            .filter(|(_, feed_monitors)| feed_monitors.contains_key(interactor))
            .map(|(feed, _)| feed.clone())
            .collect()
    }

    /// Everyone who should receive data on (feed, topic): the topic's
    /// subscribers with their authorization, then the feed's monitors.
    pub(crate) fn subscribers_to(
        &self,
        feed: &str,
        topic: &str,
    ) -> Vec<(Arc<Interactor>, AuthorizationInfo)> {
        let mut recipients = Vec::new();
        if let Some(subscribers) = self
            .subscriptions
            .get(feed)
            .and_then(|topics| topics.get(topic))
        {
            for (subscriber, state) in subscribers {
                recipients.push((Arc::clone(subscriber), state.authorization.clone()));
            }
        }
        if let Some(feed_monitors) = self.monitors.get(feed) {
            for monitor in feed_monitors.keys() {
                recipients.push((Arc::clone(monitor), AuthorizationInfo::open()));
            }
        }
        recipients
    }

    /// The feed's (topic, subscribers) pairs, for notifier backfill.
    /// Monitors are not included.
    pub(crate) fn subscribers_to_feed(&self, feed: &str) -> Vec<(String, Vec<Arc<Interactor>>)> {
        self.subscriptions
            .get(feed)
            .map(|topics| {
                topics
                    .iter()
                    .map(|(topic, subscribers)| {
                        (topic.clone(), subscribers.keys().cloned().collect())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
