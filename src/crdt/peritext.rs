// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Rich text: an RGA character sequence plus anchored formatting marks.
//!
//! Marks name their bounds by atom id (`start`, `end`, both inclusive)
//! rather than by offset, so a mark keeps covering the same characters while
//! concurrent inserts and deletes shift offsets around it. Concurrent marks
//! combine by union: every live mark whose interval contains an atom applies
//! to it.
//!
//! Membership is decided on storage positions, which include tombstones.
//! For live atoms this is the same as comparing visible indices, and it keeps
//! a mark in force after one of its anchor atoms is deleted.
//!
//! # Example
//!
//! ```
//! use pocket_crdt::config::Config;
//! use pocket_crdt::crdt::peritext::PeritextDoc;
//!
//! let mut doc = PeritextDoc::new(&Config::new("alice"));
//! doc.insert(0, "Hello world");
//! doc.format(0, 5, "bold", None).unwrap();
//!
//! let spans = doc.spans();
//! assert_eq!(spans[0].text, "Hello");
//! assert_eq!(spans[0].marks[0].kind, "bold");
//! assert_eq!(spans[1].text, " world");
//! ```

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::config::Config;
use crate::crdt::Crdt;
use crate::crdt::op::TextAction;
use crate::crdt::op::TextOp;
use crate::crdt::primitives::ItemId;
use crate::crdt::primitives::LamportClock;
use crate::crdt::rga::CharAtom;
use crate::crdt::rga::Integration;
use crate::crdt::rga::Sequence;
use crate::error::Error;
use crate::error::Result;
use crate::log::OpLog;
use crate::node::Hash;
use crate::node::NodeId;
use crate::node::hash;
use crate::observe::Observers;
use crate::observe::Origin;
use crate::observe::SubscriptionId;

/// A formatting mark over an inclusive atom interval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatMark {
    pub id: ItemId,
    /// Mark type, e.g. `bold`, `italic`, `link`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional payload, e.g. a link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "startId")]
    pub start: ItemId,
    #[serde(rename = "endId")]
    pub end: ItemId,
    #[serde(rename = "nodeId")]
    pub node: NodeId,
    pub timestamp: u64,
    pub deleted: bool,
}

/// A mark as seen by a rendered span.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanMark {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<&FormatMark> for SpanMark {
    fn from(mark: &FormatMark) -> SpanMark {
        return SpanMark {
            id: mark.id.clone(),
            kind: mark.kind.clone(),
            value: mark.value.clone(),
        };
    }
}

/// A maximal run of visible text sharing one active mark set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    /// Active marks, ordered by type then id.
    pub marks: Vec<SpanMark>,
}

/// Serializable document state: atoms in storage order, marks by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub atoms: Vec<CharAtom>,
    pub marks: Vec<FormatMark>,
}

/// Event delivered to text observers.
#[derive(Clone, Debug, PartialEq)]
pub struct TextChange {
    pub op: TextOp,
    pub origin: Origin,
}

/// A replicated rich text document.
#[derive(Debug)]
pub struct PeritextDoc {
    node: NodeId,
    clock: LamportClock,
    /// Last id counter issued (or observed) for `node`.
    counter: u64,
    sequence: Sequence,
    marks: BTreeMap<ItemId, FormatMark>,
    /// Unformats that arrived before their mark.
    pending_unformats: FxHashSet<ItemId>,
    log: OpLog<TextOp>,
    observers: Observers<TextChange>,
}

impl PeritextDoc {
    pub fn new(config: &Config) -> PeritextDoc {
        return PeritextDoc {
            node: config.node(),
            clock: LamportClock::new(),
            counter: 0,
            sequence: Sequence::new(),
            marks: BTreeMap::new(),
            pending_unformats: FxHashSet::default(),
            log: OpLog::new(config.max_log_size),
            observers: Observers::new(),
        };
    }

    /// Rebuild a document from a snapshot.
    pub fn from_snapshot(config: &Config, snapshot: Snapshot) -> PeritextDoc {
        let mut doc = PeritextDoc::new(config);
        for atom in snapshot.atoms {
            doc.observe(&atom.id, atom.timestamp);
            doc.sequence.integrate(atom);
        }
        for mark in snapshot.marks {
            doc.observe(&mark.id, mark.timestamp);
            doc.marks.insert(mark.id.clone(), mark);
        }
        return doc;
    }

    pub fn from_json(config: &Config, input: &str) -> Result<PeritextDoc> {
        let snapshot: Snapshot = serde_json::from_str(input)?;
        return Ok(PeritextDoc::from_snapshot(config, snapshot));
    }

    pub fn node(&self) -> &NodeId {
        return &self.node;
    }

    /// Current Lamport time.
    pub fn time(&self) -> u64 {
        return self.clock.time();
    }

    /// Visible text.
    pub fn text(&self) -> String {
        return self.sequence.text();
    }

    /// Visible length in characters.
    pub fn len(&self) -> usize {
        return self.sequence.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.sequence.is_empty();
    }

    /// Id of the visible atom at `pos`.
    pub fn atom_id_at(&self, pos: usize) -> Option<ItemId> {
        return self.sequence.id_at(pos).cloned();
    }

    /// Insert `text` at visible position `pos` (clamped to the length).
    ///
    /// Returns `None` for empty text.
    pub fn insert(&mut self, pos: usize, text: &str) -> Option<TextOp> {
        if text.is_empty() {
            return None;
        }
        let timestamp = self.clock.tick();
        let mut after = self.sequence.anchor_for(pos);
        let mut atoms = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let id = self.next_id();
            let atom = CharAtom::new(id.clone(), ch, after, timestamp);
            self.sequence.integrate(atom.clone());
            atoms.push(atom);
            after = id;
        }
        tracing::trace!(node = %self.node, pos, count = atoms.len(), "local insert");

        let op = TextOp {
            node: self.node.clone(),
            timestamp,
            action: TextAction::Insert { atoms },
        };
        self.record(op.clone(), Origin::Local);
        return Some(op);
    }

    /// Delete `len` visible characters starting at `pos`, clamped.
    ///
    /// Returns `None` if the range covers nothing.
    pub fn delete(&mut self, pos: usize, len: usize) -> Option<TextOp> {
        let ids = self.sequence.ids_in_range(pos, len);
        if ids.is_empty() {
            return None;
        }
        let timestamp = self.clock.tick();
        for id in &ids {
            self.sequence.delete(id);
        }
        tracing::trace!(node = %self.node, pos, count = ids.len(), "local delete");

        let op = TextOp {
            node: self.node.clone(),
            timestamp,
            action: TextAction::Delete { ids },
        };
        self.record(op.clone(), Origin::Local);
        return Some(op);
    }

    /// Apply a mark of type `kind` to the visible range `[start, end)`.
    pub fn format(
        &mut self,
        start: usize,
        end: usize,
        kind: &str,
        value: Option<String>,
    ) -> Result<TextOp> {
        let len = self.sequence.len();
        let invalid = Error::InvalidRange { start, end, len };
        if start >= end || end > len {
            return Err(invalid);
        }
        let (Some(start_id), Some(end_id)) = (self.atom_id_at(start), self.atom_id_at(end - 1)) else {
            return Err(invalid);
        };

        let timestamp = self.clock.tick();
        let mark = FormatMark {
            id: self.next_id(),
            kind: kind.to_string(),
            value,
            start: start_id,
            end: end_id,
            node: self.node.clone(),
            timestamp,
            deleted: false,
        };
        tracing::debug!(node = %self.node, mark = %mark.id, kind, start, end, "created mark");
        self.marks.insert(mark.id.clone(), mark.clone());

        let op = TextOp {
            node: self.node.clone(),
            timestamp,
            action: TextAction::Format { mark },
        };
        self.record(op.clone(), Origin::Local);
        return Ok(op);
    }

    /// Tombstone a mark. Fails if this replica has never seen it.
    pub fn unformat(&mut self, mark_id: &ItemId) -> Result<TextOp> {
        let Some(mark) = self.marks.get_mut(mark_id) else {
            return Err(Error::UnknownMark(mark_id.clone()));
        };
        mark.deleted = true;
        let timestamp = self.clock.tick();
        tracing::debug!(node = %self.node, mark = %mark_id, "removed mark");

        let op = TextOp {
            node: self.node.clone(),
            timestamp,
            action: TextAction::Unformat {
                mark: mark_id.clone(),
            },
        };
        self.record(op.clone(), Origin::Local);
        return Ok(op);
    }

    /// Apply an operation received from a peer.
    ///
    /// Returns true if the operation changed anything, including being
    /// parked for a missing anchor or target. Only such operations are
    /// logged, so relaying the log forwards everything this replica knows.
    /// Redelivery returns false and leaves the clock alone.
    pub fn apply_remote_op(&mut self, op: &TextOp) -> bool {
        let mut changed = false;
        match &op.action {
            TextAction::Insert { atoms } => {
                for atom in atoms {
                    self.observe(&atom.id, atom.timestamp);
                    if self.sequence.integrate(atom.clone()) != Integration::Duplicate {
                        changed = true;
                    }
                }
            }
            TextAction::Delete { ids } => {
                for id in ids {
                    changed |= self.sequence.delete(id).changed();
                }
            }
            TextAction::Format { mark } => {
                changed = self.admit_mark(mark);
            }
            TextAction::Unformat { mark } => {
                changed = self.tombstone_mark(mark);
            }
        }

        if changed {
            self.clock.receive(op.timestamp);
            tracing::debug!(node = %self.node, from = %op.node, kind = op.kind(), timestamp = op.timestamp, "applied remote op");
            self.record(op.clone(), Origin::Remote(op.node.clone()));
        }
        return changed;
    }

    /// Live marks in id order.
    pub fn marks(&self) -> Vec<&FormatMark> {
        return self.marks.values().filter(|m| !m.deleted).collect();
    }

    /// Live marks covering the visible atom at `pos`, by type then id.
    pub fn marks_at(&self, pos: usize) -> Vec<&FormatMark> {
        let Some(id) = self.sequence.id_at(pos) else {
            return Vec::new();
        };
        let Some(at) = self.sequence.position_of(id) else {
            return Vec::new();
        };
        return self
            .mark_ranges()
            .into_iter()
            .filter(|(start, end, _)| *start <= at && at <= *end)
            .map(|(_, _, mark)| mark)
            .collect();
    }

    /// Visible text split wherever the active mark set changes.
    pub fn spans(&self) -> Vec<Span> {
        let ranges = self.mark_ranges();
        let mut spans: Vec<Span> = Vec::new();
        let mut current: Option<(SmallVec<[usize; 4]>, String)> = None;

        for (i, atom) in self.sequence.atoms().iter().enumerate() {
            if !atom.is_visible() {
                continue;
            }
            // Storage position, root included.
            let at = i + 1;
            let active: SmallVec<[usize; 4]> = ranges
                .iter()
                .enumerate()
                .filter(|(_, (start, end, _))| *start <= at && at <= *end)
                .map(|(k, _)| k)
                .collect();

            if let Some((set, text)) = &mut current {
                if *set == active {
                    text.push(atom.ch);
                    continue;
                }
            }
            if let Some((set, text)) = current.take() {
                spans.push(Self::span(&ranges, &set, text));
            }
            current = Some((active, atom.ch.to_string()));
        }
        if let Some((set, text)) = current {
            spans.push(Self::span(&ranges, &set, text));
        }
        return spans;
    }

    pub fn snapshot(&self) -> Snapshot {
        return Snapshot {
            atoms: self.sequence.atoms().to_vec(),
            marks: self.marks.values().cloned().collect(),
        };
    }

    pub fn snapshot_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(&self.snapshot())?);
    }

    /// blake3 digest of the canonical snapshot.
    pub fn digest(&self) -> Result<Hash> {
        let bytes = serde_json::to_vec(&self.snapshot())?;
        return Ok(hash(&bytes));
    }

    /// Retained operations stamped strictly after `timestamp`.
    pub fn operations_since(&self, timestamp: u64) -> Vec<TextOp> {
        return self
            .log
            .entries()
            .filter(|e| e.op.timestamp > timestamp)
            .map(|e| e.op.clone())
            .collect();
    }

    pub fn operation_log(&self) -> Vec<TextOp> {
        return self.log.ops();
    }

    /// Local operations not yet flushed to the transport.
    pub fn flush_ops(&mut self) -> Vec<TextOp> {
        return self.log.take_unflushed();
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&TextChange) + Send + 'static) -> SubscriptionId {
        return self.observers.subscribe(callback);
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        return self.observers.unsubscribe(id);
    }

    fn next_id(&mut self) -> ItemId {
        self.counter += 1;
        return ItemId::new(self.node.clone(), self.counter);
    }

    /// Keep the local counter and clock ahead of ids we have seen.
    fn observe(&mut self, id: &ItemId, timestamp: u64) {
        if id.node == self.node && id.counter > self.counter {
            self.counter = id.counter;
        }
        self.clock.merge(&LamportClock::with_time(timestamp));
    }

    fn admit_mark(&mut self, mark: &FormatMark) -> bool {
        self.observe(&mark.id, mark.timestamp);
        if let Some(existing) = self.marks.get_mut(&mark.id) {
            if mark.deleted && !existing.deleted {
                existing.deleted = true;
                return true;
            }
            return false;
        }
        let mut mark = mark.clone();
        if self.pending_unformats.remove(&mark.id) {
            mark.deleted = true;
        }
        self.marks.insert(mark.id.clone(), mark);
        return true;
    }

    fn tombstone_mark(&mut self, id: &ItemId) -> bool {
        let Some(mark) = self.marks.get_mut(id) else {
            return self.pending_unformats.insert(id.clone());
        };
        if mark.deleted {
            return false;
        }
        mark.deleted = true;
        return true;
    }

    /// Live marks with resolved storage bounds, ordered by type then id.
    /// Marks whose anchors have not arrived are skipped.
    fn mark_ranges(&self) -> Vec<(usize, usize, &FormatMark)> {
        let mut ranges: Vec<(usize, usize, &FormatMark)> = self
            .marks
            .values()
            .filter(|m| !m.deleted)
            .filter_map(|m| {
                let start = self.sequence.position_of(&m.start)?;
                let end = self.sequence.position_of(&m.end)?;
                return Some((start, end, m));
            })
            .collect();
        ranges.sort_by(|a, b| a.2.kind.cmp(&b.2.kind).then_with(|| a.2.id.cmp(&b.2.id)));
        return ranges;
    }

    fn span(ranges: &[(usize, usize, &FormatMark)], set: &[usize], text: String) -> Span {
        let marks = set.iter().map(|&k| SpanMark::from(ranges[k].2)).collect();
        return Span { text, marks };
    }

    fn record(&mut self, op: TextOp, origin: Origin) {
        let local = origin == Origin::Local;
        if !self.observers.is_empty() {
            let change = TextChange {
                op: op.clone(),
                origin,
            };
            self.observers.notify(&change);
        }
        self.log.append(op, local);
    }
}

impl Crdt for PeritextDoc {
    /// Fold in another replica's atoms, tombstones and marks.
    /// Observers are not notified and nothing is logged.
    fn merge(&mut self, other: &PeritextDoc) {
        for atom in other.sequence.atoms() {
            self.observe(&atom.id, atom.timestamp);
        }
        self.sequence.merge(&other.sequence);
        for mark in other.marks.values() {
            self.admit_mark(mark);
        }
        for id in &other.pending_unformats {
            self.tombstone_mark(id);
        }
        self.clock.merge(&other.clock);
    }
}
