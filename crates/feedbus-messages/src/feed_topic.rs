//! The (feed, topic) composite key used throughout the routing tables.

use std::fmt;

/// A feed/topic pair. Equality is structural and case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedTopic {
    pub feed: String,
    pub topic: String,
}

impl FeedTopic {
    #[must_use]
    pub fn new(feed: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            topic: topic.into(),
        }
    }
}

impl fmt::Display for FeedTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.feed, self.topic)
    }
}
