// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Replica identity and content digests.

use blake3::Hasher;
use rand_core::OsRng;
use rand_core::RngCore;
use serde::Deserialize;
use serde::Serialize;

/// Reserved node name of the synthetic root atom.
pub const ROOT_NODE: &str = "__root__";

/// Identifies a replica (device, tab, offline session).
///
/// Ordering is plain string ordering; it is the tie-break used by both the
/// last-write-wins admission test and RGA sibling ordering.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

/// A blake3 hash, 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; 32]);

/// Hash a message using blake3.
pub fn hash(message: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(message);
    let result = hasher.finalize();
    return Hash(*result.as_bytes());
}

impl NodeId {
    pub fn new(name: impl Into<String>) -> NodeId {
        return NodeId(name.into());
    }

    /// Generate a random node id from OS entropy (16 hex characters).
    pub fn generate() -> NodeId {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        return NodeId(hex(&bytes));
    }

    /// The node that owns the root sentinel.
    pub fn root() -> NodeId {
        return NodeId(ROOT_NODE.to_string());
    }

    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    pub fn is_root(&self) -> bool {
        return self.0 == ROOT_NODE;
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> NodeId {
        return NodeId::new(name);
    }
}

impl From<String> for NodeId {
    fn from(name: String) -> NodeId {
        return NodeId(name);
    }
}

impl Hash {
    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        return hex(&self.0);
    }
}

fn hex(bytes: &[u8]) -> String {
    return bytes.iter().map(|b| format!("{:02x}", b)).collect();
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(&self.0);
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "NodeId({})", self.0);
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "Hash({})", hex(&self.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct_hex() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 16);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn node_ids_order_as_strings() {
        assert!(NodeId::new("alice") < NodeId::new("bob"));
        assert!(NodeId::new("B") < NodeId::new("a"));
    }

    #[test]
    fn root_is_recognized() {
        assert!(NodeId::root().is_root());
        assert!(!NodeId::new("alice").is_root());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&NodeId::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(b"hello world"), hash(b"hello world"));
        assert_ne!(hash(b"hello world"), hash(b"hello world!"));
        assert_eq!(hash(b"").to_hex().len(), 64);
    }
}
