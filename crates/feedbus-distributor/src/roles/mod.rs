//! Role-based access control.
//!
//! Four capabilities exist on the bus. A connection's effective set for a
//! feed is decided by a three-level override chain evaluated in
//! [`policy::DistributorRole::has_role`]: global allow/deny, then per-feed
//! allow/deny, then per-(address, user) allow/deny. A level overrides only
//! the roles it names, and within a level deny beats allow. Policies are
//! immutable for the life of the process, so decisions are memoized per
//! connection.

pub mod policy;

pub use policy::{DistributorRole, FeedRole, InteractorRole};

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single capability an interactor may hold on a feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May publish multicast and unicast data.
    Publish,
    /// May subscribe to topics (and monitor feeds).
    Subscribe,
    /// May request subscription-churn notifications.
    Notify,
    /// Receives authorization requests for the feed.
    Authorize,
}

/// Every role, in a fixed order. Used to build per-feed role indices.
pub const ALL_ROLES: [Role; 4] = [Role::Publish, Role::Subscribe, Role::Notify, Role::Authorize];

impl Role {
    fn bit(self) -> u8 {
        match self {
            Role::Publish => 1,
            Role::Subscribe => 1 << 1,
            Role::Notify => 1 << 2,
            Role::Authorize => 1 << 3,
        }
    }
}

/// A set of [`Role`]s. Serializes as a list of role names.
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    /// The set holding all four roles.
    #[must_use]
    pub fn all() -> RoleSet {
        RoleSet::of(&ALL_ROLES)
    }

    #[must_use]
    pub fn of(roles: &[Role]) -> RoleSet {
        roles.iter().fold(RoleSet::EMPTY, |set, role| set.with(*role))
    }

    #[must_use]
    pub fn with(self, role: Role) -> RoleSet {
        RoleSet(self.0 | role.bit())
    }

    #[must_use]
    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Vec<Role>> for RoleSet {
    fn from(roles: Vec<Role>) -> Self {
        RoleSet::of(&roles)
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        ALL_ROLES.iter().copied().filter(|role| set.contains(*role)).collect()
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(ALL_ROLES.iter().filter(|role| self.contains(**role)))
            .finish()
    }
}
