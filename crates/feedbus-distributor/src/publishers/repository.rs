//! Which publishers have published on which topics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use feedbus_messages::FeedTopic;

use crate::interactors::Interactor;

/// A bidirectional publisher/topic relation.
///
/// Relations accumulate as data flows and are only torn down when a
/// publisher disconnects. Removal reports exactly the topics left with no
/// remaining publisher, which drive stale images to subscribers.
#[derive(Default)]
pub(crate) struct PublisherRepository {
    topics_by_publisher: HashMap<Uuid, HashSet<FeedTopic>>,
    publishers_by_topic: HashMap<FeedTopic, HashSet<Uuid>>,
}

impl PublisherRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record that `publisher` published on `feed_topic`. Idempotent.
    pub(crate) fn add_publisher(&mut self, publisher: &Arc<Interactor>, feed_topic: &FeedTopic) {
        self.topics_by_publisher
            .entry(publisher.id())
            .or_default()
            .insert(feed_topic.clone());
        self.publishers_by_topic
            .entry(feed_topic.clone())
            .or_default()
            .insert(publisher.id());
    }

    /// Drop all of `publisher`'s relations; returns the topics that now
    /// have no publisher at all.
    pub(crate) fn remove_publisher(&mut self, publisher: &Arc<Interactor>) -> Vec<FeedTopic> {
        let Some(feed_topics) = self.topics_by_publisher.remove(&publisher.id()) else {
            return Vec::new();
        };

        let mut orphaned = Vec::new();
        for feed_topic in feed_topics {
            if let Some(publishers) = self.publishers_by_topic.get_mut(&feed_topic) {
                publishers.remove(&publisher.id());
                if publishers.is_empty() {
                    self.publishers_by_topic.remove(&feed_topic);
                    orphaned.push(feed_topic);
                }
            }
        }
        orphaned
    }
}
