//! # Integration Tests
//!
//! Distributor and client adapter working together over real TCP.
//!
//! Clients arrive through `NullStreamSecurity`, so every connection shares
//! the anonymous localhost identity. Tests that need ordering across
//! connections sequence themselves on observable traffic (notification
//! churn, authorization round-trips) rather than sleeps.

#[cfg(test)]
pub(crate) mod support;

mod authorization;
mod end_to_end;
mod resilience;
