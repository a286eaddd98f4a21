// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Clock primitives for tracking causality and ordering.
//!
//! # Lamport Clock
//!
//! A simple monotonic counter. If event A causally precedes B then
//! `A < B`; the converse does not hold, concurrent events may still
//! compare unequal.
//!
//! Complexity:
//! - tick: O(1)
//! - receive: O(1)
//! - compare: O(1)
//!
//! # Vector Clock
//!
//! Tracks causality across multiple replicas. Each replica maintains
//! a counter, and the vector represents knowledge of all replicas.
//! The non-mutating helpers (`increment`, `merged`) return new clocks.
//!
//! Complexity:
//! - tick: O(log n)
//! - merge: O(n) where n is number of replicas
//! - compare: O(n)
//!
//! # Hybrid Logical Clock
//!
//! A (physical ms, logical counter) pair. The logical counter only
//! advances when physical time has not moved forward since the last event.
//!
//! # Serialization
//!
//! Every clock renders to a compact string. Parsing is lenient: malformed
//! input yields the zero value instead of an error.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering as AtomicOrdering;

use serde::Deserialize;
use serde::Serialize;

use crate::crdt::Crdt;
use crate::node::NodeId;

/// Source of wall-clock milliseconds for the hybrid clock.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Milliseconds since the unix epoch, from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now_ms(&self) -> u64 {
        return std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
    }
}

/// A settable time source. Clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> ManualClock {
        return ManualClock {
            now: Arc::new(AtomicU64::new(now_ms)),
        };
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, AtomicOrdering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, AtomicOrdering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        return self.now.load(AtomicOrdering::SeqCst);
    }
}

/// A Lamport clock for partial ordering of events.
///
/// The clock is a simple counter that:
/// - Increments on local events (tick)
/// - Moves to max(local, remote) + 1 on receiving messages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LamportClock {
    time: u64,
}

impl LamportClock {
    /// Create a new clock starting at 0.
    pub fn new() -> LamportClock {
        return LamportClock { time: 0 };
    }

    /// Create a clock with a specific starting time.
    pub fn with_time(time: u64) -> LamportClock {
        return LamportClock { time };
    }

    /// Get the current time.
    #[inline]
    pub fn time(&self) -> u64 {
        return self.time;
    }

    /// Increment the clock for a local event.
    /// Returns the new time.
    #[inline]
    pub fn tick(&mut self) -> u64 {
        self.time += 1;
        return self.time;
    }

    /// Fold in a remote timestamp: local time becomes max(local, remote) + 1.
    /// Returns the new time.
    #[inline]
    pub fn receive(&mut self, remote_time: u64) -> u64 {
        self.time = self.time.max(remote_time) + 1;
        return self.time;
    }

    pub fn serialize(&self) -> String {
        return self.time.to_string();
    }

    /// Parse a serialized clock. Malformed input yields time 0.
    pub fn deserialize(input: &str) -> LamportClock {
        let time = input.trim().parse::<u64>().unwrap_or(0);
        return LamportClock { time };
    }
}

impl Crdt for LamportClock {
    /// Sets local time to max(local, other), without ticking.
    fn merge(&mut self, other: &LamportClock) {
        self.time = self.time.max(other.time);
    }
}

impl PartialOrd for LamportClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for LamportClock {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.time.cmp(&other.time);
    }
}

/// Causal relation between two vector clocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Causality {
    /// Every entry is <= the other's, at least one strictly.
    Before,
    /// The reverse of `Before`.
    After,
    /// Identical entries.
    Equal,
    /// Neither dominates.
    Concurrent,
}

impl Causality {
    /// -1 when dominated, +1 when dominating, 0 when neither dominates.
    pub fn signum(self) -> i8 {
        return match self {
            Causality::Before => -1,
            Causality::After => 1,
            Causality::Equal | Causality::Concurrent => 0,
        };
    }

    pub fn reverse(self) -> Causality {
        return match self {
            Causality::Before => Causality::After,
            Causality::After => Causality::Before,
            other => other,
        };
    }
}

/// A vector clock for tracking causality across replicas.
///
/// Entries are kept sorted by node so serialization is canonical.
/// Absent entries read as 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    entries: BTreeMap<NodeId, u64>,
}

impl VectorClock {
    /// Create an empty vector clock.
    pub fn new() -> VectorClock {
        return VectorClock {
            entries: BTreeMap::new(),
        };
    }

    /// Get the time for a specific replica.
    pub fn get(&self, replica: &NodeId) -> u64 {
        return self.entries.get(replica).copied().unwrap_or(0);
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, u64)> {
        return self.entries.iter().map(|(k, v)| (k, *v));
    }

    /// Increment the clock for the given replica in place.
    /// Returns the new time for that replica.
    pub fn tick(&mut self, replica: &NodeId) -> u64 {
        let entry = self.entries.entry(replica.clone()).or_insert(0);
        *entry += 1;
        return *entry;
    }

    /// A copy of this clock with `replica` incremented (1 if absent).
    pub fn increment(&self, replica: &NodeId) -> VectorClock {
        let mut next = self.clone();
        next.tick(replica);
        return next;
    }

    /// Raise a specific entry to at least `time`.
    pub fn update(&mut self, replica: &NodeId, time: u64) {
        let entry = self.entries.entry(replica.clone()).or_insert(0);
        *entry = (*entry).max(time);
    }

    /// The pointwise maximum of both clocks, leaving both untouched.
    pub fn merged(&self, other: &VectorClock) -> VectorClock {
        let mut next = self.clone();
        next.merge(other);
        return next;
    }

    /// Compare two clocks over the union of their keys.
    ///
    /// Clocks with disjoint, non-empty key sets are `Concurrent`.
    pub fn compare(&self, other: &VectorClock) -> Causality {
        let mut less = false;
        let mut greater = false;

        for (k, v) in &self.entries {
            let other_v = other.get(k);
            if *v < other_v {
                less = true;
            } else if *v > other_v {
                greater = true;
            }
        }
        for (k, v) in &other.entries {
            if self.entries.contains_key(k) {
                continue;
            }
            if *v > 0 {
                less = true;
            }
        }

        return match (less, greater) {
            (true, false) => Causality::Before,
            (false, true) => Causality::After,
            (false, false) => Causality::Equal,
            (true, true) => Causality::Concurrent,
        };
    }

    /// Check if this clock causally precedes another.
    pub fn happens_before(&self, other: &VectorClock) -> bool {
        return self.compare(other) == Causality::Before;
    }

    /// Check if two clocks are concurrent (neither happens-before the other).
    pub fn concurrent_with(&self, other: &VectorClock) -> bool {
        return self.compare(other) == Causality::Concurrent;
    }

    /// True iff `self[k] >= other[k]` for every key of `other`.
    /// Equal clocks descend from each other.
    pub fn descends(&self, other: &VectorClock) -> bool {
        return other.entries.iter().all(|(k, v)| self.get(k) >= *v);
    }

    /// Render as `node:count` pairs joined by commas, sorted by node.
    pub fn serialize(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect();
        return parts.join(",");
    }

    /// Parse a serialized clock. Empty or malformed input yields an empty clock.
    pub fn deserialize(input: &str) -> VectorClock {
        let mut clock = VectorClock::new();
        if input.trim().is_empty() {
            return clock;
        }
        for part in input.split(',') {
            let Some((node, count)) = part.rsplit_once(':') else {
                return VectorClock::new();
            };
            let Ok(count) = count.trim().parse::<u64>() else {
                return VectorClock::new();
            };
            let node = node.trim();
            if node.is_empty() {
                return VectorClock::new();
            }
            clock.update(&NodeId::new(node), count);
        }
        return clock;
    }
}

impl Crdt for VectorClock {
    /// Pointwise maximum of all entries.
    fn merge(&mut self, other: &VectorClock) {
        for (k, v) in &other.entries {
            let entry = self.entries.entry(k.clone()).or_insert(0);
            *entry = (*entry).max(*v);
        }
    }
}

impl FromIterator<(NodeId, u64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (NodeId, u64)>>(iter: I) -> VectorClock {
        let mut clock = VectorClock::new();
        for (node, time) in iter {
            clock.update(&node, time);
        }
        return clock;
    }
}

/// A hybrid logical timestamp, ordered by physical time then counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HlcTimestamp {
    /// Physical milliseconds.
    pub pt: u64,
    /// Logical counter within `pt`.
    pub lc: u32,
}

impl HlcTimestamp {
    pub const ZERO: HlcTimestamp = HlcTimestamp { pt: 0, lc: 0 };

    pub fn new(pt: u64, lc: u32) -> HlcTimestamp {
        return HlcTimestamp { pt, lc };
    }

    /// Render as `"pt.lc"`.
    pub fn serialize(&self) -> String {
        return format!("{}.{}", self.pt, self.lc);
    }

    /// Parse `"pt.lc"`. Malformed input yields the zero timestamp.
    pub fn deserialize(input: &str) -> HlcTimestamp {
        let Some((pt, lc)) = input.trim().split_once('.') else {
            return HlcTimestamp::ZERO;
        };
        return match (pt.parse::<u64>(), lc.parse::<u32>()) {
            (Ok(pt), Ok(lc)) => HlcTimestamp { pt, lc },
            _ => HlcTimestamp::ZERO,
        };
    }
}

impl std::fmt::Display for HlcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}.{}", self.pt, self.lc);
    }
}

/// A hybrid logical clock reading physical time from a `TimeSource`.
#[derive(Clone)]
pub struct HybridLogicalClock {
    last: HlcTimestamp,
    time: Arc<dyn TimeSource>,
}

impl HybridLogicalClock {
    pub fn new(time: Arc<dyn TimeSource>) -> HybridLogicalClock {
        return HybridLogicalClock {
            last: HlcTimestamp::ZERO,
            time,
        };
    }

    /// A clock backed by the system wall clock.
    pub fn wall() -> HybridLogicalClock {
        return HybridLogicalClock::new(Arc::new(WallClock));
    }

    /// The most recently issued timestamp.
    pub fn last(&self) -> HlcTimestamp {
        return self.last;
    }

    /// Advance for a local event.
    pub fn tick(&mut self) -> HlcTimestamp {
        let now = self.time.now_ms();
        return self.tick_at(now);
    }

    /// Advance for a local event observed at physical time `now`.
    pub fn tick_at(&mut self, now: u64) -> HlcTimestamp {
        if now > self.last.pt {
            self.last = HlcTimestamp { pt: now, lc: 0 };
        } else {
            self.last.lc = self.last.lc.saturating_add(1);
        }
        return self.last;
    }

    /// Fold in an observed remote timestamp.
    pub fn receive(&mut self, remote: HlcTimestamp) -> HlcTimestamp {
        let now = self.time.now_ms();
        return self.receive_at(now, remote);
    }

    /// Fold in a remote timestamp observed at physical time `now`.
    pub fn receive_at(&mut self, now: u64, remote: HlcTimestamp) -> HlcTimestamp {
        let local = self.last;
        let pt = now.max(local.pt).max(remote.pt);
        let lc = if pt == remote.pt {
            local.lc.max(remote.lc).saturating_add(1)
        } else if pt == local.pt {
            local.lc.saturating_add(1)
        } else {
            0
        };
        self.last = HlcTimestamp { pt, lc };
        return self.last;
    }

    /// Order two timestamps by physical time, then logical counter.
    pub fn compare(a: &HlcTimestamp, b: &HlcTimestamp) -> Ordering {
        return a.cmp(b);
    }
}

impl std::fmt::Debug for HybridLogicalClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "HybridLogicalClock({})", self.last);
    }
}
