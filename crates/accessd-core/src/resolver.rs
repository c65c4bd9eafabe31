//! Gathers the grants of an identity from the policy indexes

use std::sync::Arc;

use accessd_types::{AccessError, AccessResult, AccessSet, Identity, PolicyIndex, SubjectGrants};
use futures::future::try_join_all;

/// Grants of one identity: the user's own plus one entry per group, in sorted group order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGrants {
    pub user: SubjectGrants,
    pub groups: Vec<SubjectGrants>,
}

impl UserGrants {
    /// Union of the user's and every group's grants
    pub fn to_access_set(&self) -> AccessSet {
        self.groups.iter().fold(self.user.to_access_set(), |mut set, group| {
            set.merge(&group.to_access_set());
            set
        })
    }

    /// Number of subjects looked up to build these grants
    pub fn subjects(&self) -> usize {
        1 + self.groups.len()
    }
}

/// Looks up users in one index and groups in another
#[derive(Clone)]
pub struct PolicyResolver {
    users: Arc<dyn PolicyIndex>,
    groups: Arc<dyn PolicyIndex>,
}

impl PolicyResolver {
    pub fn new(users: Arc<dyn PolicyIndex>, groups: Arc<dyn PolicyIndex>) -> Self {
        Self { users, groups }
    }

    /// Fetch the grants for the identity's name and each of its groups.
    ///
    /// All lookups run concurrently. The first failure aborts resolution and names the
    /// subject whose lookup failed.
    pub async fn resolve(&self, identity: &Identity) -> AccessResult<UserGrants> {
        let user = async {
            self.users
                .subject_grants(identity.name())
                .await
                .map_err(|e| AccessError::unavailable(identity.name(), e))
        };

        let groups = try_join_all(identity.groups().iter().map(|group| async move {
            self.groups
                .subject_grants(group)
                .await
                .map_err(|e| AccessError::unavailable(group.as_str(), e))
        }));

        let (user, groups) = futures::try_join!(user, groups)?;
        Ok(UserGrants { user, groups })
    }
}
