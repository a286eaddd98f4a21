// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Errors raised by local validation.
//!
//! Duplicate or out-of-order remote delivery is never an error; those cases
//! are absorbed by idempotent merge rules and do not appear here.

use crate::crdt::field::FieldKind;
use crate::crdt::primitives::id::ItemId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write or merge touched a field that was never declared.
    #[error("field `{field}` of document `{document}` is not registered")]
    UnregisteredField { document: String, field: String },

    /// A remote operation disagrees with the locally declared field kind.
    #[error("field `{field}` is declared as {expected} but the operation targets {found}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    /// The action cannot be applied to this kind of field.
    #[error("`{action}` is not a valid action for {kind} field `{field}`")]
    InvalidAction {
        field: String,
        kind: FieldKind,
        action: &'static str,
    },

    /// A counter operation arrived without the sender's contribution maps.
    #[error("counter operation on field `{field}` carries no counter state")]
    MissingCounter { field: String },

    /// A format range did not resolve to visible characters.
    #[error("format range {start}..{end} is not within the visible text (length {len})")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("unknown format mark {0:?}")]
    UnknownMark(ItemId),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
