// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Replicated data types: counters, field state and rich text.

pub mod counter;
pub mod field;
pub mod op;
pub mod peritext;
pub mod primitives;
pub mod rga;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
pub trait Crdt {
    /// Merge another instance into this one.
    fn merge(&mut self, other: &Self);
}
