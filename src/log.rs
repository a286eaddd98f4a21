// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Bounded operation logs.
//!
//! A log is a FIFO ring buffer of operation records. Once the configured
//! capacity is exceeded the oldest entries are evicted silently; eviction is
//! not coordinated with delivery, so a consumer that needs every operation
//! must flush or persist before entries age out.
//!
//! Entries are numbered with a monotonic sequence. The flush cursor remembers
//! the first sequence not yet handed to the transport, so `take_unflushed`
//! returns each locally-originated operation at most once.

use std::collections::VecDeque;

/// Capacity used when none is configured.
pub const DEFAULT_MAX_LOG_SIZE: usize = 1000;

/// One retained operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<T> {
    /// Position in the log since creation, never reused.
    pub seq: u64,
    /// Whether this replica originated the operation.
    pub local: bool,
    pub op: T,
}

/// A bounded append-only log of operations.
#[derive(Clone, Debug)]
pub struct OpLog<T> {
    capacity: usize,
    entries: VecDeque<Entry<T>>,
    next_seq: u64,
    flushed: u64,
    evicted: u64,
}

impl<T: Clone> OpLog<T> {
    /// Create an empty log retaining at most `capacity` entries (at least 1).
    pub fn new(capacity: usize) -> OpLog<T> {
        return OpLog {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            next_seq: 0,
            flushed: 0,
            evicted: 0,
        };
    }

    /// Return the number of retained entries.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Return true if the log retains nothing.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn capacity(&self) -> usize {
        return self.capacity;
    }

    /// Total number of entries evicted since creation.
    pub fn evicted(&self) -> u64 {
        return self.evicted;
    }

    /// Append an operation, evicting the oldest entries past capacity.
    /// Returns the entry's sequence number.
    pub fn append(&mut self, op: T, local: bool) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(Entry { seq, local, op });
        while self.entries.len() > self.capacity {
            if let Some(old) = self.entries.pop_front() {
                self.evicted += 1;
                tracing::trace!(seq = old.seq, local = old.local, "evicted operation from log");
            }
        }
        return seq;
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Entry<T>> {
        return self.entries.iter();
    }

    /// Clones of every retained operation, oldest first.
    pub fn ops(&self) -> Vec<T> {
        return self.entries.iter().map(|e| e.op.clone()).collect();
    }

    /// Number of local operations not yet returned by `take_unflushed`.
    pub fn unflushed_len(&self) -> usize {
        return self
            .entries
            .iter()
            .filter(|e| e.local && e.seq >= self.flushed)
            .count();
    }

    /// Return local operations appended since the last call and advance the
    /// flush cursor. Operations evicted before flushing are lost.
    pub fn take_unflushed(&mut self) -> Vec<T> {
        let flushed = self.flushed;
        let ops = self
            .entries
            .iter()
            .filter(|e| e.local && e.seq >= flushed)
            .map(|e| e.op.clone())
            .collect();
        self.flushed = self.next_seq;
        return ops;
    }
}

impl<T: Clone> Default for OpLog<T> {
    fn default() -> Self {
        return Self::new(DEFAULT_MAX_LOG_SIZE);
    }
}
