//! The three-level role override chain.

use std::collections::HashMap;
use std::net::IpAddr;

use super::{Role, RoleSet};

/// Per-(address, user) overrides. The most specific level; always wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InteractorRole {
    pub allow: RoleSet,
    pub deny: RoleSet,
}

impl InteractorRole {
    #[must_use]
    pub fn new(allow: RoleSet, deny: RoleSet) -> Self {
        Self { allow, deny }
    }

    fn has_role(&self, role: Role, mut decision: bool) -> bool {
        if self.allow.contains(role) {
            decision = true;
        }
        if self.deny.contains(role) {
            decision = false;
        }
        decision
    }
}

/// Per-feed overrides plus the per-principal table beneath them.
///
/// The presence of a `FeedRole` entry is what makes a feed require
/// authorization; `requires_entitlement` is carried as deployment metadata
/// for authorizers and tooling.
#[derive(Clone, Debug, Default)]
pub struct FeedRole {
    pub allow: RoleSet,
    pub deny: RoleSet,
    pub requires_entitlement: bool,
    interactor_roles: HashMap<IpAddr, HashMap<String, InteractorRole>>,
}

impl FeedRole {
    #[must_use]
    pub fn new(allow: RoleSet, deny: RoleSet, requires_entitlement: bool) -> Self {
        Self {
            allow,
            deny,
            requires_entitlement,
            interactor_roles: HashMap::new(),
        }
    }

    pub fn add_interactor_role(&mut self, address: IpAddr, user: impl Into<String>, role: InteractorRole) {
        self.interactor_roles
            .entry(address)
            .or_default()
            .insert(user.into(), role);
    }

    fn has_role(&self, address: IpAddr, user: &str, role: Role, mut decision: bool) -> bool {
        if self.allow.contains(role) {
            decision = true;
        }
        if self.deny.contains(role) {
            decision = false;
        }
        match self.interactor_roles.get(&address).and_then(|users| users.get(user)) {
            Some(interactor_role) => interactor_role.has_role(role, decision),
            None => decision,
        }
    }
}

/// The process-wide policy: global allow/deny and the per-feed table.
///
/// The default policy allows every role everywhere and configures no feed
/// roles, which is the plain (non-authorizing) bus.
#[derive(Clone, Debug)]
pub struct DistributorRole {
    pub allow: RoleSet,
    pub deny: RoleSet,
    feed_roles: HashMap<String, FeedRole>,
}

impl Default for DistributorRole {
    fn default() -> Self {
        Self {
            allow: RoleSet::all(),
            deny: RoleSet::EMPTY,
            feed_roles: HashMap::new(),
        }
    }
}

impl DistributorRole {
    #[must_use]
    pub fn new(allow: RoleSet, deny: RoleSet, feed_roles: HashMap<String, FeedRole>) -> Self {
        Self { allow, deny, feed_roles }
    }

    /// Evaluates the full override chain for one (connection, feed, role).
    #[must_use]
    pub fn has_role(&self, address: IpAddr, user: &str, feed: &str, role: Role) -> bool {
        let mut decision = self.allow.contains(role);
        if self.deny.contains(role) {
            decision = false;
        }
        match self.feed_roles.get(feed) {
            Some(feed_role) => feed_role.has_role(address, user, role, decision),
            None => decision,
        }
    }

    /// Only feeds with an explicit role entry require authorization.
    #[must_use]
    pub fn is_authorization_required(&self, feed: &str) -> bool {
        self.feed_roles.contains_key(feed)
    }

    /// The feeds that carry explicit role entries.
    pub fn feeds(&self) -> impl Iterator<Item = &str> {
        self.feed_roles.keys().map(String::as_str)
    }
}
