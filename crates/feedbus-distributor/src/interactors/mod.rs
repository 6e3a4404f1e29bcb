//! Connections and their lifecycle.
//!
//! An [`Interactor`] wraps one secured stream with a write queue and the two
//! socket loops. The repository indexes live connections by id and by the
//! (feed, role) pairs the policy names; the manager layers the lifecycle on
//! top: admission, advertisements, teardown, and authorization fan-out.

mod interactor;
mod manager;
mod repository;
mod security;

pub use interactor::Interactor;
pub use security::{
    AsyncStream, NullStreamSecurity, SecuredStream, StreamSecurity, ANONYMOUS_USER,
};

pub(crate) use manager::{AuthorizationOutcome, InteractorManager};
pub(crate) use repository::InteractorRepository;
