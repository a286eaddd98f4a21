// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! State-based counters.
//!
//! Each node only ever raises its own contribution, so merging two states
//! by pointwise maximum is commutative, associative and idempotent, and the
//! sum over all contributions counts every increment exactly once.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::crdt::Crdt;
use crate::node::NodeId;

/// A grow-only counter: one monotonic contribution per node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GCounter {
    counts: BTreeMap<NodeId, u64>,
}

impl GCounter {
    pub fn new() -> GCounter {
        return GCounter {
            counts: BTreeMap::new(),
        };
    }

    /// Add `amount` to `node`'s contribution. Returns the new contribution.
    pub fn increment(&mut self, node: &NodeId, amount: u64) -> u64 {
        let entry = self.counts.entry(node.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
        return *entry;
    }

    /// The contribution of a single node.
    pub fn get(&self, node: &NodeId) -> u64 {
        return self.counts.get(node).copied().unwrap_or(0);
    }

    /// Sum over all node contributions.
    pub fn value(&self) -> u64 {
        return self.counts.values().fold(0u64, |acc, v| acc.saturating_add(*v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, u64)> {
        return self.counts.iter().map(|(k, v)| (k, *v));
    }
}

impl Crdt for GCounter {
    fn merge(&mut self, other: &GCounter) {
        for (node, count) in &other.counts {
            let entry = self.counts.entry(node.clone()).or_insert(0);
            *entry = (*entry).max(*count);
        }
    }
}

/// A counter supporting decrements: two grow-only halves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnCounter {
    pub positive: GCounter,
    pub negative: GCounter,
}

impl PnCounter {
    pub fn new() -> PnCounter {
        return PnCounter::default();
    }

    pub fn increment(&mut self, node: &NodeId, amount: u64) {
        self.positive.increment(node, amount);
    }

    pub fn decrement(&mut self, node: &NodeId, amount: u64) {
        self.negative.increment(node, amount);
    }

    /// sum(positive) - sum(negative), saturating at the bounds of `i64`.
    pub fn value(&self) -> i64 {
        let net = self.positive.value() as i128 - self.negative.value() as i128;
        return net.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    }
}

impl Crdt for PnCounter {
    fn merge(&mut self, other: &PnCounter) {
        self.positive.merge(&other.positive);
        self.negative.merge(&other.negative);
    }
}
