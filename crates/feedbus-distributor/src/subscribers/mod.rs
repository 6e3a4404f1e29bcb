//! Subscription state and the routing orchestrator.

mod manager;
mod repository;

pub use repository::AuthorizationInfo;

pub(crate) use manager::SubscriptionManager;
pub(crate) use repository::SubscriptionRepository;
