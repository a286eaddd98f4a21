// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Replicated Growable Array (RGA) over character atoms.
//!
//! The sequence is a flat vector of atoms in document order, seeded with a
//! synthetic root atom at index 0, plus an id → index table. Key rules:
//!
//! 1. **Anchors**: every atom records `after`, the atom it was inserted
//!    immediately after when it was created. Anchors never change.
//!
//! 2. **Sibling order**: atoms sharing an anchor are ordered by id,
//!    descending (node first, then counter). Integration scans right from the
//!    anchor, skipping greater siblings and everything anchored inside them,
//!    and stops at the first smaller sibling or at the first atom anchored
//!    left of our anchor.
//!
//! 3. **Tombstones**: deleted atoms stay in place forever so that inserts
//!    which have not arrived yet can still anchor on them.
//!
//! 4. **Causal parking**: an atom whose anchor is unknown waits in a parking
//!    lot keyed by the missing anchor, and a delete for an unknown id is
//!    remembered until its atom arrives. Delivery order therefore never
//!    affects the result.
//!
//! Placement depends only on the immutable `(id, after)` pairs, so any
//! replica that integrates the same atoms ends up with the same vector.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;

use crate::crdt::Crdt;
use crate::crdt::primitives::ItemId;
use crate::node::NodeId;

/// One character of a replicated text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharAtom {
    pub id: ItemId,
    #[serde(rename = "char")]
    pub ch: char,
    /// The atom this one was inserted after at creation time.
    #[serde(rename = "afterId")]
    pub after: ItemId,
    /// One-way tombstone flag.
    pub deleted: bool,
    #[serde(rename = "nodeId")]
    pub node: NodeId,
    /// Lamport time of the inserting operation.
    pub timestamp: u64,
}

impl CharAtom {
    pub fn new(id: ItemId, ch: char, after: ItemId, timestamp: u64) -> CharAtom {
        let node = id.node.clone();
        return CharAtom {
            id,
            ch,
            after,
            deleted: false,
            node,
            timestamp,
        };
    }

    fn root() -> CharAtom {
        return CharAtom::new(ItemId::root(), '\0', ItemId::root(), 0);
    }

    pub fn is_visible(&self) -> bool {
        return !self.deleted && !self.id.is_root();
    }
}

/// Outcome of integrating one atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Integration {
    /// Placed into the sequence (possibly releasing parked descendants).
    Placed,
    /// Anchor unknown; held until it arrives.
    Parked,
    /// Already present or already parked.
    Duplicate,
}

/// Outcome of deleting one atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deletion {
    /// A visible atom was tombstoned.
    Tombstoned,
    /// The atom is unknown; it will be tombstoned on arrival.
    Pending,
    /// Already deleted, already pending, or the root.
    NoOp,
}

impl Deletion {
    /// Whether the delete changed local state.
    pub fn changed(&self) -> bool {
        return *self != Deletion::NoOp;
    }
}

/// The flat atom array with its lookup tables.
#[derive(Clone, Debug)]
pub struct Sequence {
    /// Atoms in document order; index 0 is the root.
    atoms: Vec<CharAtom>,
    /// Atom id to index in `atoms`.
    index: FxHashMap<ItemId, usize>,
    /// Atoms waiting on a missing anchor, keyed by that anchor.
    parked: FxHashMap<ItemId, Vec<CharAtom>>,
    parked_ids: FxHashSet<ItemId>,
    /// Deletes that arrived before their atom.
    pending_deletes: FxHashSet<ItemId>,
    /// Number of visible atoms.
    visible: usize,
}

impl Sequence {
    /// Create a sequence holding only the root atom.
    pub fn new() -> Sequence {
        let root = CharAtom::root();
        let mut index = FxHashMap::default();
        index.insert(root.id.clone(), 0);
        return Sequence {
            atoms: vec![root],
            index,
            parked: FxHashMap::default(),
            parked_ids: FxHashSet::default(),
            pending_deletes: FxHashSet::default(),
            visible: 0,
        };
    }

    /// Get the visible length (excluding tombstones and the root).
    pub fn len(&self) -> usize {
        return self.visible;
    }

    pub fn is_empty(&self) -> bool {
        return self.visible == 0;
    }

    /// Every integrated atom in storage order, tombstones included, root excluded.
    pub fn atoms(&self) -> &[CharAtom] {
        return &self.atoms[1..];
    }

    pub fn visible_atoms(&self) -> impl Iterator<Item = &CharAtom> {
        return self.atoms.iter().filter(|a| a.is_visible());
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        return self.index.contains_key(id);
    }

    pub fn get(&self, id: &ItemId) -> Option<&CharAtom> {
        let idx = *self.index.get(id)?;
        return self.atoms.get(idx);
    }

    /// Storage position of an atom (root = 0), tombstones counted.
    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        return self.index.get(id).copied();
    }

    /// Number of atoms waiting for an anchor.
    pub fn parked_len(&self) -> usize {
        return self.parked_ids.len();
    }

    /// Id of the visible atom at `pos`, if any.
    pub fn id_at(&self, pos: usize) -> Option<&ItemId> {
        return self.visible_atoms().nth(pos).map(|a| &a.id);
    }

    /// The anchor for an insertion at visible position `pos`: the visible
    /// atom just before it, or the root. `pos` is clamped to the length.
    pub fn anchor_for(&self, pos: usize) -> ItemId {
        let pos = pos.min(self.visible);
        if pos == 0 {
            return ItemId::root();
        }
        return match self.id_at(pos - 1) {
            Some(id) => id.clone(),
            None => ItemId::root(),
        };
    }

    /// Visible text.
    pub fn text(&self) -> String {
        return self.visible_atoms().map(|a| a.ch).collect();
    }

    /// Integrate an atom, then any parked atoms waiting on it.
    pub fn integrate(&mut self, atom: CharAtom) -> Integration {
        if self.index.contains_key(&atom.id) || self.parked_ids.contains(&atom.id) {
            return Integration::Duplicate;
        }
        if !self.index.contains_key(&atom.after) {
            tracing::trace!(id = %atom.id, after = %atom.after, "parked atom with unknown anchor");
            self.parked_ids.insert(atom.id.clone());
            self.parked.entry(atom.after.clone()).or_default().push(atom);
            return Integration::Parked;
        }

        let mut ready = vec![atom];
        while let Some(atom) = ready.pop() {
            let id = atom.id.clone();
            self.place(atom);
            if let Some(children) = self.parked.remove(&id) {
                for child in children {
                    self.parked_ids.remove(&child.id);
                    ready.push(child);
                }
            }
        }
        return Integration::Placed;
    }

    /// Tombstone an atom.
    ///
    /// Unknown ids are remembered and tombstoned on arrival.
    pub fn delete(&mut self, id: &ItemId) -> Deletion {
        if id.is_root() {
            return Deletion::NoOp;
        }
        let Some(&idx) = self.index.get(id) else {
            if self.pending_deletes.insert(id.clone()) {
                tracing::trace!(%id, "pending delete for unknown atom");
                return Deletion::Pending;
            }
            return Deletion::NoOp;
        };
        let atom = &mut self.atoms[idx];
        if atom.deleted {
            return Deletion::NoOp;
        }
        atom.deleted = true;
        self.visible -= 1;
        return Deletion::Tombstoned;
    }

    /// Ids of the visible atoms in `[start, start + len)`, clamped.
    pub fn ids_in_range(&self, start: usize, len: usize) -> Vec<ItemId> {
        return self
            .visible_atoms()
            .skip(start)
            .take(len)
            .map(|a| a.id.clone())
            .collect();
    }

    /// Insert `atom` at its RGA position. The anchor must be present.
    fn place(&mut self, mut atom: CharAtom) {
        let anchor_idx = match self.index.get(&atom.after) {
            Some(&idx) => idx,
            None => return,
        };

        let mut i = anchor_idx + 1;
        while i < self.atoms.len() {
            let cur = &self.atoms[i];
            if cur.after == atom.after {
                // Sibling: greater ids stay to the left.
                if cur.id > atom.id {
                    i += 1;
                    continue;
                }
                break;
            }
            // Anchored inside the subtree we are scanning over.
            let cur_anchor = self.index.get(&cur.after).copied().unwrap_or(0);
            if cur_anchor >= anchor_idx {
                i += 1;
                continue;
            }
            break;
        }

        if self.pending_deletes.remove(&atom.id) {
            atom.deleted = true;
        }
        if atom.is_visible() {
            self.visible += 1;
        }
        tracing::trace!(id = %atom.id, after = %atom.after, at = i, "integrated atom");

        self.index.insert(atom.id.clone(), i);
        self.atoms.insert(i, atom);
        for (j, shifted) in self.atoms.iter().enumerate().skip(i + 1) {
            if let Some(slot) = self.index.get_mut(&shifted.id) {
                *slot = j;
            }
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        return Self::new();
    }
}

impl Crdt for Sequence {
    /// Integrate every atom and tombstone known to `other`.
    fn merge(&mut self, other: &Sequence) {
        for atom in other.atoms() {
            let mut fresh = atom.clone();
            fresh.deleted = false;
            self.integrate(fresh);
        }
        for children in other.parked.values() {
            for atom in children {
                self.integrate(atom.clone());
            }
        }
        for atom in other.atoms() {
            if atom.deleted {
                self.delete(&atom.id);
            }
        }
        for id in &other.pending_deletes {
            self.delete(id);
        }
    }
}
