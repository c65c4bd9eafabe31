//! # Accessd Types
//!
//! Shared type definitions for the accessd authorization snapshot store.
//!
//! This crate holds everything the other crates agree on: caller identities and their
//! fingerprints, the per-subject grants handed out by a policy index, the mergeable
//! [`AccessSet`], and the traits for the external collaborators that supply grants.

#![deny(unsafe_code)]

use thiserror::Error;

// ============================================================================
// Identity Types
// ============================================================================

pub mod identity;

pub use identity::{Fingerprint, Identity, UserInfo};

// ============================================================================
// Grant Types
// ============================================================================

pub mod grants;

pub use grants::{PolicyRule, RoleKind, RoleRef, SubjectGrants};

// ============================================================================
// Access Set Types
// ============================================================================

pub mod access;

pub use access::{ALL, Access, AccessKey, AccessSet, GroupResource};

// ============================================================================
// Collaborator Traits
// ============================================================================

pub mod policy;

pub use policy::{PolicyIndex, RoleRevisions};

// ============================================================================
// Error Types
// ============================================================================

/// Failure reported by a [`PolicyIndex`] lookup.
///
/// Cloneable so a single failure can be handed to every caller waiting on the same
/// computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Policy index unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PolicyResult<T> = std::result::Result<T, PolicyError>;

/// Failure resolving an authorization snapshot.
///
/// Surfaced instead of an empty snapshot so an outage never looks like "no permissions".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Authorization unavailable for subject '{subject}': {source}")]
    Unavailable {
        subject: String,
        #[source]
        source: PolicyError,
    },
}

impl AccessError {
    pub fn unavailable(subject: impl Into<String>, source: PolicyError) -> Self {
        Self::Unavailable { subject: subject.into(), source }
    }

    /// The subject whose lookup failed
    pub fn subject(&self) -> &str {
        match self {
            Self::Unavailable { subject, .. } => subject,
        }
    }
}

pub type AccessResult<T> = std::result::Result<T, AccessError>;
