//! # feedbus Test Suite
//!
//! Unified test crate for cross-crate behavior: every test here runs a real
//! distributor on an ephemeral localhost port and talks to it through the
//! real client adapter, so the full path is exercised, from control call
//! through the wire protocol, the dispatcher, and back out.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── end_to_end.rs     # Open-bus routing: pub/sub, unicast, monitors
//!     ├── authorization.rs  # Entitlement round-trips and role rejections
//!     └── resilience.rs     # Disconnect cascades, advertisements, volume
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p feedbus-tests
//!
//! # By category
//! cargo test -p feedbus-tests integration::end_to_end::
//! cargo test -p feedbus-tests integration::authorization::
//! cargo test -p feedbus-tests integration::resilience::
//! ```

pub mod integration;
