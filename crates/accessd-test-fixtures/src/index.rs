//! In-memory policy index and role revision oracle

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use accessd_types::{PolicyError, PolicyIndex, PolicyResult, RoleRevisions, SubjectGrants};
use async_trait::async_trait;

/// Policy index backed by a map, counting every lookup per subject.
///
/// Unknown subjects resolve to empty grants. A lookup delay makes concurrent callers
/// overlap, and individual subjects can be switched to failing and back.
#[derive(Default)]
pub struct StaticPolicyIndex {
    grants: Mutex<HashMap<String, SubjectGrants>>,
    failing: Mutex<HashMap<String, PolicyError>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    revisions: Option<Arc<dyn RoleRevisions>>,
}

impl StaticPolicyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grants(grants: impl IntoIterator<Item = SubjectGrants>) -> Self {
        let index = Self::new();
        for subject in grants {
            index.insert(subject);
        }
        index
    }

    /// Sleep this long inside every lookup
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stamp every returned role with its revision from `revisions`
    pub fn with_revisions(mut self, revisions: Arc<dyn RoleRevisions>) -> Self {
        self.revisions = Some(revisions);
        self
    }

    /// Add or replace the grants of `grants.subject`
    pub fn insert(&self, grants: SubjectGrants) {
        self.grants.lock().unwrap().insert(grants.subject.clone(), grants);
    }

    /// Make lookups for `subject` fail with `error` until [`StaticPolicyIndex::heal`]
    pub fn fail_subject(&self, subject: &str, error: PolicyError) {
        self.failing.lock().unwrap().insert(subject.to_string(), error);
    }

    pub fn heal(&self, subject: &str) {
        self.failing.lock().unwrap().remove(subject);
    }

    /// Lookups made for `subject`, failed ones included
    pub fn calls(&self, subject: &str) -> usize {
        self.calls.lock().unwrap().get(subject).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn stamp(&self, grants: &mut SubjectGrants) {
        let Some(revisions) = &self.revisions else {
            return;
        };
        for role in grants.role_bindings.iter_mut().chain(grants.cluster_role_bindings.iter_mut())
        {
            role.revision = revisions.role_revision(role.role_namespace(), &role.role_name);
        }
    }
}

#[async_trait]
impl PolicyIndex for StaticPolicyIndex {
    async fn subject_grants(&self, subject: &str) -> PolicyResult<SubjectGrants> {
        *self.calls.lock().unwrap().entry(subject.to_string()).or_default() += 1;
        tracing::trace!(subject = %subject, "Static policy index lookup");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failing.lock().unwrap().get(subject) {
            return Err(error.clone());
        }

        let mut grants = self
            .grants
            .lock()
            .unwrap()
            .get(subject)
            .cloned()
            .unwrap_or_else(|| SubjectGrants::empty(subject));
        self.stamp(&mut grants);
        Ok(grants)
    }
}

/// Revision oracle backed by a map; unknown roles report revision `"0"`
#[derive(Debug, Default)]
pub struct StaticRoleRevisions {
    revisions: Mutex<HashMap<(String, String), String>>,
}

impl StaticRoleRevisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, namespace: &str, name: &str, revision: &str) {
        self.revisions
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), revision.to_string());
    }
}

impl RoleRevisions for StaticRoleRevisions {
    fn role_revision(&self, namespace: &str, name: &str) -> String {
        self.revisions
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_else(|| "0".to_string())
    }
}
