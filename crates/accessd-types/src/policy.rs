//! Traits for the collaborators that know which rules exist
//!
//! The store never reads role or binding definitions itself. A [`PolicyIndex`] answers
//! "what is bound to this subject" and a [`RoleRevisions`] oracle lets index
//! implementations stamp the grants they hand out with the revision of each role.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{PolicyResult, SubjectGrants};

/// Maps a subject name (a user or a group) to everything bound to it.
///
/// Implementations sit on the request path and must not block indefinitely.
#[async_trait]
pub trait PolicyIndex: Send + Sync {
    async fn subject_grants(&self, subject: &str) -> PolicyResult<SubjectGrants>;
}

#[async_trait]
impl<T: PolicyIndex + ?Sized> PolicyIndex for Arc<T> {
    async fn subject_grants(&self, subject: &str) -> PolicyResult<SubjectGrants> {
        (**self).subject_grants(subject).await
    }
}

/// Reports an opaque revision token for a role, `namespace` being `""` for cluster roles
pub trait RoleRevisions: Send + Sync {
    fn role_revision(&self, namespace: &str, name: &str) -> String;
}

impl<T: RoleRevisions + ?Sized> RoleRevisions for Arc<T> {
    fn role_revision(&self, namespace: &str, name: &str) -> String {
        (**self).role_revision(namespace, name)
    }
}
