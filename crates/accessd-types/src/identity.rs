//! Caller identities and their fingerprints

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Domain tag hashed ahead of every identity so fingerprints cannot collide with other
/// SHA-256 keys sharing the same cache namespace.
const FINGERPRINT_DOMAIN: &[u8] = b"accessd.identity.v1";

/// An authenticated user as handed to us by the caller.
///
/// Groups arrive in whatever order the authenticator produced them and may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl UserInfo {
    pub fn new<I, S>(name: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), groups: groups.into_iter().map(Into::into).collect() }
    }
}

/// A normalized identity: groups are sorted ascending with duplicates removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    name: String,
    groups: Vec<String>,
}

impl Identity {
    /// Normalize a caller identity. The caller's group list is copied, never reordered in place.
    pub fn normalize(user: &UserInfo) -> Self {
        let mut groups = user.groups.clone();
        groups.sort_unstable();
        groups.dedup();
        Self { name: user.name.clone(), groups }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Deterministic key for this identity, used for both caching and deduplication.
    ///
    /// Every component is length-prefixed so `("ab", ["c"])` and `("a", ["bc"])` differ.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        update_prefixed(&mut hasher, self.name.as_bytes());
        hasher.update((self.groups.len() as u64).to_be_bytes());
        for group in &self.groups {
            update_prefixed(&mut hasher, group.as_bytes());
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

impl From<&UserInfo> for Identity {
    fn from(user: &UserInfo) -> Self {
        Self::normalize(user)
    }
}

fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

/// Lowercase hex SHA-256 digest of a normalized [`Identity`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let user = UserInfo::new("alice", ["qa", "dev", "qa", "admins"]);
        let identity = Identity::normalize(&user);

        assert_eq!(identity.name(), "alice");
        assert_eq!(identity.groups(), ["admins", "dev", "qa"]);
    }

    #[test]
    fn test_normalize_leaves_input_untouched() {
        let user = UserInfo::new("alice", ["qa", "dev"]);
        let _ = Identity::normalize(&user);

        assert_eq!(user.groups, vec!["qa".to_string(), "dev".to_string()]);
    }

    #[test]
    fn test_fingerprint_ignores_group_order() {
        let a = Identity::normalize(&UserInfo::new("alice", ["qa", "dev"]));
        let b = Identity::normalize(&UserInfo::new("alice", ["dev", "qa"]));
        let c = Identity::normalize(&UserInfo::new("alice", ["dev", "qa", "dev"]));

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_fingerprint_distinguishes_identities() {
        let alice = Identity::normalize(&UserInfo::new("alice", ["dev"]));
        let bob = Identity::normalize(&UserInfo::new("bob", ["dev"]));
        let alice_qa = Identity::normalize(&UserInfo::new("alice", ["qa"]));
        let alice_none = Identity::normalize(&UserInfo::new("alice", Vec::<String>::new()));

        assert_ne!(alice.fingerprint(), bob.fingerprint());
        assert_ne!(alice.fingerprint(), alice_qa.fingerprint());
        assert_ne!(alice.fingerprint(), alice_none.fingerprint());
    }

    #[test]
    fn test_fingerprint_component_boundaries() {
        let left = Identity::normalize(&UserInfo::new("ab", ["c"]));
        let right = Identity::normalize(&UserInfo::new("a", ["bc"]));
        assert_ne!(left.fingerprint(), right.fingerprint());

        let joined = Identity::normalize(&UserInfo::new("u", ["a,b"]));
        let split = Identity::normalize(&UserInfo::new("u", ["a", "b"]));
        assert_ne!(joined.fingerprint(), split.fingerprint());
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = Identity::normalize(&UserInfo::new("alice", ["dev"])).fingerprint();
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(fp.to_string(), fp.as_str());
    }

    #[test]
    fn test_user_info_deserialize_without_groups() {
        let user: UserInfo = serde_json::from_str(r#"{"name":"system:anonymous"}"#).unwrap();
        assert_eq!(user.name, "system:anonymous");
        assert!(user.groups.is_empty());
    }
}
