//! # Accessd Core - Authorization Snapshots
//!
//! Turns an identity (a user name plus group memberships) into the merged set of
//! everything it is allowed to do, and keeps recently computed sets around.
//!
//! ```text
//! access_for(user)
//!   -> normalize + fingerprint
//!   -> cache hit? done
//!   -> single flight per fingerprint
//!        -> cache re-check
//!        -> user + group lookups -> merge -> cache insert
//! ```

#![deny(unsafe_code)]

// ============================================================================
// Deduplication
// ============================================================================

pub mod single_flight;

pub use single_flight::{Flight, SingleFlight};

// ============================================================================
// Resolution
// ============================================================================

pub mod resolver;

pub use resolver::{PolicyResolver, UserGrants};

// ============================================================================
// Store
// ============================================================================

pub mod store;

pub use store::{AccessSetLookup, AccessStore, StoreOptions};
