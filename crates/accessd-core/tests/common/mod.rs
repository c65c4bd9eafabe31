//! Helper utilities for integration tests

#![allow(dead_code)] // Some test files use subsets of these utilities

use std::{sync::Arc, time::Duration};

use accessd_cache::Clock;
use accessd_core::{AccessStore, StoreOptions};
use accessd_test_fixtures::{ManualClock, StaticPolicyIndex, cluster_role, role, rule, subject};
pub use accessd_types::{GroupResource, UserInfo};

/// Store wired to in-memory indexes the test can inspect and mutate
pub struct TestFixture {
    pub users: Arc<StaticPolicyIndex>,
    pub groups: Arc<StaticPolicyIndex>,
    pub clock: Arc<ManualClock>,
    pub store: AccessStore,
}

impl TestFixture {
    /// Caching store with the default capacity and a 24h TTL on a manual clock
    pub fn new(users: StaticPolicyIndex, groups: StaticPolicyIndex) -> Self {
        Self::build(users, groups, |options| options)
    }

    pub fn uncached(users: StaticPolicyIndex, groups: StaticPolicyIndex) -> Self {
        Self::build(users, groups, |options| StoreOptions { cache_results: false, ..options })
    }

    pub fn with_ttl(users: StaticPolicyIndex, groups: StaticPolicyIndex, ttl: Duration) -> Self {
        Self::build(users, groups, |options| StoreOptions { ttl, ..options })
    }

    pub fn with_capacity(
        users: StaticPolicyIndex,
        groups: StaticPolicyIndex,
        max_capacity: u64,
    ) -> Self {
        Self::build(users, groups, |options| StoreOptions { max_capacity, ..options })
    }

    fn build(
        users: StaticPolicyIndex,
        groups: StaticPolicyIndex,
        customize: impl FnOnce(StoreOptions) -> StoreOptions,
    ) -> Self {
        let users = Arc::new(users);
        let groups = Arc::new(groups);
        let clock = Arc::new(ManualClock::new());
        let defaults = StoreOptions::builder().clock(clock.clone() as Arc<dyn Clock>).build();
        let options = customize(defaults);
        let store = AccessStore::new(users.clone(), groups.clone(), options);

        Self { users, groups, clock, store }
    }

    /// Index lookups made so far, users and groups combined
    pub fn index_calls(&self) -> usize {
        self.users.total_calls() + self.groups.total_calls()
    }
}

/// alice reads pods, group dev creates deployments, group qa reads pods
pub fn standard_users() -> StaticPolicyIndex {
    StaticPolicyIndex::with_grants([
        subject("alice", vec![role("default", "pod-reader", vec![rule("get", "pods")])], vec![]),
        subject("bob", vec![], vec![cluster_role("node-viewer", vec![rule("list", "nodes")])]),
    ])
}

pub fn standard_groups() -> StaticPolicyIndex {
    StaticPolicyIndex::with_grants([
        subject(
            "dev",
            vec![role(
                "default",
                "deployer",
                vec![rule("create", "deployments").with_api_groups(["apps"])],
            )],
            vec![],
        ),
        subject("qa", vec![role("default", "pod-reader", vec![rule("get", "pods")])], vec![]),
    ])
}

pub fn user(name: &str, groups: &[&str]) -> UserInfo {
    UserInfo::new(name, groups.iter().copied())
}
