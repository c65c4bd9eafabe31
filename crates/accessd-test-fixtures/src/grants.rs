//! Shorthand builders for grants used across test suites
//!
//! ```
//! use accessd_test_fixtures::{role, rule, subject};
//!
//! let reader = role("default", "pod-reader", vec![rule("get", "pods")]);
//! let alice = subject("alice", vec![reader], vec![]);
//! assert_eq!(alice.role_bindings.len(), 1);
//! ```

use accessd_types::{PolicyRule, RoleKind, RoleRef, SubjectGrants};

/// Single-verb rule on a core-group resource
pub fn rule(verb: &str, resource: &str) -> PolicyRule {
    PolicyRule::new([verb], [resource])
}

/// Namespaced `Role` bound in `namespace`
pub fn role(namespace: &str, name: &str, rules: Vec<PolicyRule>) -> RoleRef {
    RoleRef::namespaced(namespace, RoleKind::Role, name, rules)
}

/// `ClusterRole` bound cluster-wide
pub fn cluster_role(name: &str, rules: Vec<PolicyRule>) -> RoleRef {
    RoleRef::cluster(name, rules)
}

pub fn subject(
    name: &str,
    role_bindings: Vec<RoleRef>,
    cluster_role_bindings: Vec<RoleRef>,
) -> SubjectGrants {
    SubjectGrants { subject: name.to_string(), role_bindings, cluster_role_bindings }
}
