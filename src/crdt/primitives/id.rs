// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Identifiers for character atoms and format marks.
//!
//! An `ItemId` is a `(node, counter)` pair. Each node issues counters
//! monotonically and never reuses one, so ids are globally unique without
//! coordination. Ids are totally ordered: by node first, then by counter.
//! That order is the RGA sibling tie-break.

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

use crate::node::NodeId;

/// Identifies an atom or a mark.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId {
    /// The node that created the item.
    pub node: NodeId,
    /// Per-node monotonic counter, starting at 1.
    pub counter: u64,
}

impl ItemId {
    pub fn new(node: impl Into<NodeId>, counter: u64) -> ItemId {
        return ItemId {
            node: node.into(),
            counter,
        };
    }

    /// The synthetic root atom's id, `(__root__, 0)`.
    pub fn root() -> ItemId {
        return ItemId {
            node: NodeId::root(),
            counter: 0,
        };
    }

    pub fn is_root(&self) -> bool {
        return self.counter == 0 && self.node.is_root();
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compare by node first, then by counter
        match self.node.cmp(&other.node) {
            Ordering::Equal => self.counter.cmp(&other.counter),
            other => other,
        }
    }
}

impl std::fmt::Debug for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "ItemId({}, {})", self.node, self.counter);
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}:{}", self.node, self.counter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_id_ordering() {
        let a = ItemId::new("alice", 1);
        let b = ItemId::new("alice", 2);
        let c = ItemId::new("bob", 1);

        assert!(a < b);
        assert!(a < c); // "alice" < "bob"
        assert!(b < c);
    }

    #[test]
    fn node_dominates_counter() {
        assert!(ItemId::new("bob", 1) > ItemId::new("alice", 99));
    }

    #[test]
    fn root_sentinel() {
        assert!(ItemId::root().is_root());
        assert!(!ItemId::new("alice", 0).is_root());
        assert_eq!(ItemId::root().to_string(), "__root__:0");
    }
}
