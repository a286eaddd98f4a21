// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Operation records exchanged between replicas.
//!
//! Every record is self-describing: it carries a kind tag, the originating
//! node, a logical timestamp, and the ids needed to apply it idempotently on
//! another replica. The transport treats them as opaque serde values.
//!
//! For rich text we store:
//! - Insert: "these atoms, each anchored after the atom named in `after`"
//! - Delete: "tombstone these atom ids"
//! - Format / Unformat: "this mark exists" / "this mark is tombstoned"
//!
//! Atom ids survive concurrent edits where numeric offsets would shift.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::crdt::counter::PnCounter;
use crate::crdt::field::FieldKind;
use crate::crdt::peritext::FormatMark;
use crate::crdt::primitives::HlcTimestamp;
use crate::crdt::primitives::ItemId;
use crate::crdt::rga::CharAtom;
use crate::node::NodeId;

/// What a text operation does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TextAction {
    /// A run of atoms, in insertion order. Each atom names its own anchor.
    Insert { atoms: Vec<CharAtom> },
    /// Atom ids to tombstone.
    Delete { ids: Vec<ItemId> },
    /// A new formatting mark.
    Format { mark: FormatMark },
    /// Tombstone a formatting mark.
    Unformat { mark: ItemId },
}

/// An operation on a rich text document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOp {
    /// The node that issued the operation.
    pub node: NodeId,
    /// Lamport time at the issuing node.
    pub timestamp: u64,
    pub action: TextAction,
}

impl TextOp {
    pub fn kind(&self) -> &'static str {
        return match self.action {
            TextAction::Insert { .. } => "insert",
            TextAction::Delete { .. } => "delete",
            TextAction::Format { .. } => "format",
            TextAction::Unformat { .. } => "unformat",
        };
    }
}

/// What a field operation does. Which actions are valid depends on the
/// field's declared kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FieldAction {
    /// Replace a register's value.
    Set(Value),
    /// Raise the local node's positive contribution.
    Increment(u64),
    /// Raise the local node's negative contribution (pn-counter only).
    Decrement(u64),
    /// Add a value to a set unless an equal value is present.
    Add(Value),
    /// Remove the first equal value from a set.
    Remove(Value),
    /// Shallow-merge keys into a map.
    Put(Map<String, Value>),
}

impl FieldAction {
    pub fn name(&self) -> &'static str {
        return match self {
            FieldAction::Set(_) => "set",
            FieldAction::Increment(_) => "increment",
            FieldAction::Decrement(_) => "decrement",
            FieldAction::Add(_) => "add",
            FieldAction::Remove(_) => "remove",
            FieldAction::Put(_) => "put",
        };
    }
}

/// An operation on one field of one document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOp {
    pub document: String,
    pub field: String,
    /// The field kind declared at the issuing node.
    #[serde(rename = "type")]
    pub field_kind: FieldKind,
    pub action: FieldAction,
    /// Counter fields ship the sender's full contribution maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<PnCounter>,
    pub node: NodeId,
    pub timestamp: HlcTimestamp,
}
