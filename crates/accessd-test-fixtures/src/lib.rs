//! Test fixtures for accessd test suites
//!
//! In-memory stand-ins for the policy index, the role revision oracle and the clock, plus
//! grant builders and the shared proptest configuration.

#![deny(unsafe_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod clock;
pub mod grants;
pub mod index;
pub mod proptest_config;
pub mod tier;

pub use clock::ManualClock;
pub use grants::{cluster_role, role, rule, subject};
pub use index::{StaticPolicyIndex, StaticRoleRevisions};
