//! The mergeable authorization snapshot

use std::collections::{BTreeMap, BTreeSet};

use crate::Fingerprint;

/// Wildcard matching any verb, API group, resource, namespace, or resource name
pub const ALL: &str = "*";

/// An API group plus resource, e.g. `apps` / `deployments`. The core group is `""`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self { group: group.into(), resource: resource.into() }
    }

    /// A resource in the core API group
    pub fn core(resource: impl Into<String>) -> Self {
        Self::new("", resource)
    }
}

/// Lookup key of an [`AccessSet`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessKey {
    pub verb: String,
    pub group_resource: GroupResource,
}

/// Where a grant applies: a namespace (or `*`) and a resource name (or `*`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Access {
    pub namespace: String,
    pub resource_name: String,
}

impl Access {
    pub fn new(namespace: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), resource_name: resource_name.into() }
    }

    /// Every object in every namespace
    pub fn everywhere() -> Self {
        Self::new(ALL, ALL)
    }

    pub fn grants(&self, namespace: &str, name: &str) -> bool {
        (self.namespace == ALL || self.namespace == namespace)
            && (self.resource_name == ALL || self.resource_name == name)
    }
}

/// Merged permissions of a user and its groups.
///
/// `id` is set to the identity fingerprint once the set has been cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSet {
    pub id: Option<Fingerprint>,
    set: BTreeMap<AccessKey, BTreeSet<Access>>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, verb: impl Into<String>, group_resource: GroupResource, access: Access) {
        let key = AccessKey { verb: verb.into(), group_resource };
        self.set.entry(key).or_default().insert(access);
    }

    /// Union `other` into `self`. The `id` of `self` is kept.
    pub fn merge(&mut self, other: &AccessSet) {
        for (key, accesses) in &other.set {
            match self.set.get_mut(key) {
                Some(existing) => existing.extend(accesses.iter().cloned()),
                None => {
                    self.set.insert(key.clone(), accesses.clone());
                },
            }
        }
    }

    /// Whether `verb` on `name` of `group_resource` in `namespace` is granted.
    ///
    /// Wildcards stored in the verb, group, resource, namespace, or name position match
    /// anything.
    pub fn grants(
        &self,
        verb: &str,
        group_resource: &GroupResource,
        namespace: &str,
        name: &str,
    ) -> bool {
        self.matching(verb, group_resource).any(|access| access.grants(namespace, name))
    }

    /// Every access applicable to `verb` on `group_resource`, wildcard keys included
    pub fn access_list_for(&self, verb: &str, group_resource: &GroupResource) -> BTreeSet<Access> {
        self.matching(verb, group_resource).cloned().collect()
    }

    /// Namespaces with at least one explicit grant (cluster-wide grants are reported as `*`)
    pub fn namespaces(&self) -> BTreeSet<&str> {
        self.set.values().flatten().map(|access| access.namespace.as_str()).collect()
    }

    /// Compare grants while ignoring `id`
    pub fn same_grants(&self, other: &AccessSet) -> bool {
        self.set == other.set
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccessKey, &Access)> {
        self.set.iter().flat_map(|(key, accesses)| accesses.iter().map(move |a| (key, a)))
    }

    /// Number of distinct (key, access) grants
    pub fn len(&self) -> usize {
        self.set.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    fn matching<'a>(
        &'a self,
        verb: &'a str,
        group_resource: &'a GroupResource,
    ) -> impl Iterator<Item = &'a Access> + 'a {
        [ALL, verb].into_iter().flat_map(move |v| {
            [ALL, group_resource.group.as_str()].into_iter().flat_map(move |g| {
                [ALL, group_resource.resource.as_str()].into_iter().flat_map(move |r| {
                    let key =
                        AccessKey { verb: v.to_string(), group_resource: GroupResource::new(g, r) };
                    self.set.get(&key).into_iter().flatten()
                })
            })
        })
    }
}
