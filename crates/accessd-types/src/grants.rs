//! Per-subject grants as returned by a policy index

use serde::{Deserialize, Serialize};

use crate::{ALL, Access, AccessSet, GroupResource};

/// A single RBAC rule: verbs allowed on resources of some API groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub verbs: Vec<String>,
    /// Empty means the core API group `""`
    #[serde(default)]
    pub api_groups: Vec<String>,
    pub resources: Vec<String>,
    /// Empty means every object of the resource
    #[serde(default)]
    pub resource_names: Vec<String>,
}

impl PolicyRule {
    pub fn new<V, R>(verbs: V, resources: R) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            verbs: verbs.into_iter().map(Into::into).collect(),
            api_groups: Vec::new(),
            resources: resources.into_iter().map(Into::into).collect(),
            resource_names: Vec::new(),
        }
    }

    pub fn with_api_groups<I>(mut self, api_groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.api_groups = api_groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resource_names<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.resource_names = names.into_iter().map(Into::into).collect();
        self
    }

    fn add_to(&self, set: &mut AccessSet, namespace: &str) {
        let core = [String::new()];
        let groups: &[String] = if self.api_groups.is_empty() { &core } else { &self.api_groups };
        let all = [ALL.to_string()];
        let names: &[String] =
            if self.resource_names.is_empty() { &all } else { &self.resource_names };

        for verb in &self.verbs {
            for group in groups {
                for resource in &self.resources {
                    for name in names {
                        set.add(
                            verb.as_str(),
                            GroupResource::new(group.as_str(), resource.as_str()),
                            Access::new(namespace, name.as_str()),
                        );
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    Role,
    ClusterRole,
}

/// A role granted to a subject through a binding, with its rules already resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    /// Namespace of the binding; `None` for cluster role bindings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub role_name: String,
    pub kind: RoleKind,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    /// Opaque revision of the referenced role, stamped by the policy index
    #[serde(default)]
    pub revision: String,
}

impl RoleRef {
    /// A role bound inside `namespace`
    pub fn namespaced(
        namespace: impl Into<String>,
        kind: RoleKind,
        role_name: impl Into<String>,
        rules: Vec<PolicyRule>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            role_name: role_name.into(),
            kind,
            rules,
            revision: String::new(),
        }
    }

    /// A cluster role bound cluster-wide
    pub fn cluster(role_name: impl Into<String>, rules: Vec<PolicyRule>) -> Self {
        Self {
            namespace: None,
            role_name: role_name.into(),
            kind: RoleKind::ClusterRole,
            rules,
            revision: String::new(),
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    /// Namespace the role definition itself lives in (`""` for cluster roles)
    pub fn role_namespace(&self) -> &str {
        match (self.kind, &self.namespace) {
            (RoleKind::Role, Some(namespace)) => namespace.as_str(),
            _ => "",
        }
    }

    fn add_to(&self, set: &mut AccessSet) {
        let namespace = self.namespace.as_deref().unwrap_or(ALL);
        for rule in &self.rules {
            rule.add_to(set, namespace);
        }
    }
}

/// Everything granted to a single user or group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGrants {
    pub subject: String,
    #[serde(default)]
    pub role_bindings: Vec<RoleRef>,
    #[serde(default)]
    pub cluster_role_bindings: Vec<RoleRef>,
}

impl SubjectGrants {
    /// A subject with no bindings
    pub fn empty(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.role_bindings.is_empty() && self.cluster_role_bindings.is_empty()
    }

    pub fn role_refs(&self) -> impl Iterator<Item = &RoleRef> {
        self.role_bindings.iter().chain(&self.cluster_role_bindings)
    }

    pub fn to_access_set(&self) -> AccessSet {
        let mut set = AccessSet::new();
        for role in self.role_refs() {
            role.add_to(&mut set);
        }
        set
    }
}
