//! Connection bookkeeping and the feed/role index.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::interactors::Interactor;
use crate::roles::{DistributorRole, Role, ALL_ROLES};

/// All live connections, indexed by id and by (feed, role).
///
/// The (feed, role) index only covers feeds named in the policy; it exists
/// so authorization requests can be broadcast to every authorizer of a feed
/// without scanning all connections. Both maps are owned by the dispatcher
/// task, so no locking is needed.
pub(crate) struct InteractorRepository {
    policy: Arc<DistributorRole>,
    interactors: HashMap<Uuid, Arc<Interactor>>,
    feed_role_index: HashMap<String, HashMap<Role, HashSet<Uuid>>>,
}

impl InteractorRepository {
    pub(crate) fn new(policy: Arc<DistributorRole>) -> Self {
        Self {
            policy,
            interactors: HashMap::new(),
            feed_role_index: HashMap::new(),
        }
    }

    pub(crate) fn policy(&self) -> &Arc<DistributorRole> {
        &self.policy
    }

    pub(crate) fn add(&mut self, interactor: Arc<Interactor>) {
        self.index_feed_roles(&interactor);
        self.interactors.insert(interactor.id(), interactor);
    }

    pub(crate) fn remove(&mut self, id: Uuid) -> Option<Arc<Interactor>> {
        let removed = self.interactors.remove(&id);
        if removed.is_some() {
            self.unindex_feed_roles(id);
        }
        removed
    }

    pub(crate) fn find(&self, id: Uuid) -> Option<Arc<Interactor>> {
        self.interactors.get(&id).cloned()
    }

    /// Every connection holding `role` on `feed`, per the policy index.
    pub(crate) fn find_feed_role(&self, feed: &str, role: Role) -> Vec<Arc<Interactor>> {
        self.feed_role_index
            .get(feed)
            .and_then(|by_role| by_role.get(&role))
            .map(|members| {
                members
                    .iter()
                    .filter_map(|id| self.interactors.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Interactor>> {
        self.interactors.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.interactors.len()
    }

    /// Remove and return every connection, for shutdown.
    pub(crate) fn drain(&mut self) -> Vec<Arc<Interactor>> {
        self.feed_role_index.clear();
        self.interactors.drain().map(|(_, interactor)| interactor).collect()
    }

    fn index_feed_roles(&mut self, interactor: &Arc<Interactor>) {
        for feed in self.policy.feeds() {
            let by_role = self.feed_role_index.entry(feed.to_string()).or_default();
            for role in ALL_ROLES {
                if interactor.has_role(feed, role) {
                    by_role.entry(role).or_default().insert(interactor.id());
                }
            }
        }
    }

    fn unindex_feed_roles(&mut self, id: Uuid) {
        self.feed_role_index.retain(|_, by_role| {
            by_role.retain(|_, members| {
                members.remove(&id);
                !members.is_empty()
            });
            !by_role.is_empty()
        });
    }
}
