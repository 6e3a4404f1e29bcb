//! Who wants to hear about subscription churn, per feed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::interactors::Interactor;

/// Refcounted feed to notifiable map.
///
/// Counts mirror the subscription table so a client that requests
/// notifications twice must withdraw twice. Empty feeds are pruned eagerly.
#[derive(Default)]
pub(crate) struct NotificationRepository {
    feed_notifiables: HashMap<String, HashMap<Arc<Interactor>, usize>>,
}

impl NotificationRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Count a request; true when it is the first for (notifiable, feed).
    pub(crate) fn add_request(&mut self, notifiable: &Arc<Interactor>, feed: &str) -> bool {
        let count = self
            .feed_notifiables
            .entry(feed.to_string())
            .or_default()
            .entry(Arc::clone(notifiable))
            .or_insert(0);
        *count += 1;
        *count == 1
    }

    pub(crate) fn remove_request(&mut self, notifiable: &Arc<Interactor>, feed: &str, remove_all: bool) {
        let Some(notifiables) = self.feed_notifiables.get_mut(feed) else {
            return;
        };
        let Some(count) = notifiables.get_mut(notifiable) else {
            return;
        };

        *count -= 1;
        if remove_all || *count == 0 {
            notifiables.remove(notifiable);
        }
        if notifiables.is_empty() {
            self.feed_notifiables.remove(feed);
        }
    }

    /// Drop the interactor from every feed, for disconnects.
    pub(crate) fn remove_interactor(&mut self, interactor: &Arc<Interactor>) {
        self.feed_notifiables.retain(|_, notifiables| {
            notifiables.remove(interactor);
            !notifiables.is_empty()
        });
    }

    pub(crate) fn find_notifiables(&self, feed: &str) -> Vec<Arc<Interactor>> {
        self.feed_notifiables
            .get(feed)
            .map(|notifiables| notifiables.keys().cloned().collect())
            .unwrap_or_default()
    }
}
