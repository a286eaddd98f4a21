// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Field-level replicated state keyed by (document, field).
//!
//! Every field is declared with a `FieldKind` before it can be written.
//! Local writes are stamped with the replica's node id and a hybrid logical
//! timestamp, applied immediately, and appended to a bounded log.
//!
//! Remote operations pass a uniform last-write-wins admission test: an
//! operation is admitted if its timestamp is greater than the field's, or
//! equal with a greater node id. What an admitted operation does depends on
//! the kind:
//!
//! | Kind | Effect |
//! |------|--------|
//! | `lww-register` | value replaced |
//! | `g-counter` | per-node contributions merged by max, value = sum |
//! | `pn-counter` | positive and negative maps merged by max, value = P - N |
//! | `or-set` | add if absent, remove first equal value |
//! | `lww-map` | keys shallow-merged into the map |
//!
//! Counter contributions are merged for every delivered operation, admitted
//! or not: pointwise max is idempotent and commutative on its own, and
//! gating it on the admission test would drop increments.
//!
//! Two simplifications are kept deliberately. The set compares by value
//! equality rather than per-insertion tags, so a concurrent add and remove
//! of an equal value resolve by timestamp instead of observed-remove rules.
//! The map is admitted as a whole, so concurrent writes to different keys
//! from different peers are not reconciled independently.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::config::Config;
use crate::config::FieldSchema;
use crate::crdt::Crdt;
use crate::crdt::counter::PnCounter;
use crate::crdt::op::FieldAction;
use crate::crdt::op::FieldOp;
use crate::crdt::primitives::HlcTimestamp;
use crate::crdt::primitives::HybridLogicalClock;
use crate::crdt::primitives::TimeSource;
use crate::crdt::primitives::WallClock;
use crate::error::Error;
use crate::error::Result;
use crate::log::OpLog;
use crate::node::Hash;
use crate::node::NodeId;
use crate::node::hash;
use crate::observe::Observers;
use crate::observe::Origin;
use crate::observe::SubscriptionId;

/// The replicated type backing a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    LwwRegister,
    GCounter,
    PnCounter,
    OrSet,
    LwwMap,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        return match self {
            FieldKind::LwwRegister => "lww-register",
            FieldKind::GCounter => "g-counter",
            FieldKind::PnCounter => "pn-counter",
            FieldKind::OrSet => "or-set",
            FieldKind::LwwMap => "lww-map",
        };
    }

    /// The materialized value of a field nobody has written yet.
    pub fn initial_value(&self) -> Value {
        return match self {
            FieldKind::LwwRegister => Value::Null,
            FieldKind::GCounter | FieldKind::PnCounter => Value::from(0),
            FieldKind::OrSet => Value::Array(Vec::new()),
            FieldKind::LwwMap => Value::Object(Map::new()),
        };
    }

    pub fn is_counter(&self) -> bool {
        return matches!(self, FieldKind::GCounter | FieldKind::PnCounter);
    }

    /// Whether `action` is meaningful for this kind.
    pub fn accepts(&self, action: &FieldAction) -> bool {
        return match (self, action) {
            (FieldKind::LwwRegister, FieldAction::Set(_)) => true,
            (FieldKind::GCounter, FieldAction::Increment(_)) => true,
            (FieldKind::PnCounter, FieldAction::Increment(_) | FieldAction::Decrement(_)) => true,
            (FieldKind::OrSet, FieldAction::Add(_) | FieldAction::Remove(_)) => true,
            (FieldKind::LwwMap, FieldAction::Put(_)) => true,
            _ => false,
        };
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// Materialized state of one (document, field) pair.
///
/// Never deleted; superseded in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldState {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub value: Value,
    /// Timestamp of the last admitted write.
    pub timestamp: HlcTimestamp,
    /// Node of the last admitted write.
    pub node: NodeId,
    /// Per-node contributions; only used by counter kinds.
    #[serde(default)]
    pub counter: PnCounter,
}

impl FieldState {
    fn new(kind: FieldKind) -> FieldState {
        return FieldState {
            kind,
            value: kind.initial_value(),
            timestamp: HlcTimestamp::ZERO,
            node: NodeId::new(""),
            counter: PnCounter::new(),
        };
    }

    /// The last-write-wins admission test.
    pub fn admits(&self, timestamp: HlcTimestamp, node: &NodeId) -> bool {
        if timestamp != self.timestamp {
            return timestamp > self.timestamp;
        }
        return *node > self.node;
    }

    /// Apply the value effect of an action on behalf of `node`.
    fn apply_action(&mut self, action: &FieldAction, node: &NodeId) {
        match action {
            FieldAction::Set(value) => {
                self.value = value.clone();
            }
            FieldAction::Increment(amount) => {
                self.counter.increment(node, *amount);
            }
            FieldAction::Decrement(amount) => {
                self.counter.decrement(node, *amount);
            }
            FieldAction::Add(value) => {
                let items = self.array_mut();
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
            FieldAction::Remove(value) => {
                let items = self.array_mut();
                if let Some(pos) = items.iter().position(|v| v == value) {
                    items.remove(pos);
                }
            }
            FieldAction::Put(entries) => {
                let map = self.object_mut();
                for (k, v) in entries {
                    map.insert(k.clone(), v.clone());
                }
            }
        }
        self.refresh_counter_value();
    }

    fn refresh_counter_value(&mut self) {
        match self.kind {
            FieldKind::GCounter => self.value = Value::from(self.counter.positive.value()),
            FieldKind::PnCounter => self.value = Value::from(self.counter.value()),
            _ => {}
        }
    }

    fn array_mut(&mut self) -> &mut Vec<Value> {
        if !self.value.is_array() {
            self.value = Value::Array(Vec::new());
        }
        return match &mut self.value {
            Value::Array(items) => items,
            _ => unreachable!("value was just made an array"),
        };
    }

    fn object_mut(&mut self) -> &mut Map<String, Value> {
        if !self.value.is_object() {
            self.value = Value::Object(Map::new());
        }
        return match &mut self.value {
            Value::Object(map) => map,
            _ => unreachable!("value was just made an object"),
        };
    }
}

/// Notification for an observed field change.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldChange {
    pub document: String,
    pub field: String,
    pub value: Value,
    pub origin: Origin,
}

/// Per-replica engine for field-level replicated state.
#[derive(Debug)]
pub struct FieldEngine {
    node: NodeId,
    schema: FieldSchema,
    documents: FxHashMap<String, BTreeMap<String, FieldState>>,
    clock: HybridLogicalClock,
    log: OpLog<FieldOp>,
    observers: Observers<FieldChange>,
}

impl FieldEngine {
    /// Create an engine stamping with the system wall clock.
    pub fn new(config: &Config) -> FieldEngine {
        return FieldEngine::with_time_source(config, Arc::new(WallClock));
    }

    pub fn with_time_source(config: &Config, time: Arc<dyn TimeSource>) -> FieldEngine {
        return FieldEngine {
            node: config.node(),
            schema: FieldSchema::new(),
            documents: FxHashMap::default(),
            clock: HybridLogicalClock::new(time),
            log: OpLog::new(config.max_log_size),
            observers: Observers::new(),
        };
    }

    pub fn node(&self) -> &NodeId {
        return &self.node;
    }

    /// Declare field kinds. Re-callable; later declarations win.
    pub fn register_fields(&mut self, schema: &FieldSchema) {
        for (field, kind) in schema.iter() {
            tracing::debug!(field, %kind, "registered field");
            self.schema.insert(field, kind);
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        return &self.schema;
    }

    /// Apply a local write and return the operation record to ship.
    pub fn apply(&mut self, document: &str, field: &str, action: FieldAction) -> Result<FieldOp> {
        let kind = self.declared_kind(document, field)?;
        if !kind.accepts(&action) {
            return Err(Error::InvalidAction {
                field: field.to_string(),
                kind,
                action: action.name(),
            });
        }

        let timestamp = self.clock.tick();
        let state = Self::state_mut(&mut self.documents, document, field, kind);
        state.apply_action(&action, &self.node);
        state.timestamp = timestamp;
        state.node = self.node.clone();

        let op = FieldOp {
            document: document.to_string(),
            field: field.to_string(),
            field_kind: kind,
            counter: kind.is_counter().then(|| state.counter.clone()),
            action,
            node: self.node.clone(),
            timestamp,
        };
        let value = state.value.clone();

        tracing::trace!(document, field, action = op.action.name(), %timestamp, "applied local field op");
        self.log.append(op.clone(), true);
        self.emit(document, field, value, Origin::Local);
        return Ok(op);
    }

    /// Merge operations received from `peer`.
    ///
    /// The whole batch is validated before anything is applied, so a
    /// misconfigured field rejects the batch without partial effects.
    /// Returns the number of operations that changed local state.
    pub fn merge_remote(&mut self, peer: &NodeId, ops: &[FieldOp]) -> Result<usize> {
        for op in ops {
            if let Err(err) = self.validate_remote(op) {
                tracing::warn!(%peer, document = %op.document, field = %op.field, %err, "rejected remote batch");
                return Err(err);
            }
        }

        let mut changed = 0;
        for op in ops {
            self.clock.receive(op.timestamp);
            let state = Self::state_mut(&mut self.documents, &op.document, &op.field, op.field_kind);

            let mut dirty = false;
            if state.kind.is_counter() {
                if let Some(counter) = &op.counter {
                    let before = state.counter.clone();
                    state.counter.merge(counter);
                    state.refresh_counter_value();
                    dirty = state.counter != before;
                }
            }

            if state.admits(op.timestamp, &op.node) {
                if !state.kind.is_counter() {
                    state.apply_action(&op.action, &op.node);
                }
                state.timestamp = op.timestamp;
                state.node = op.node.clone();
                dirty = true;
            }

            if !dirty {
                continue;
            }
            changed += 1;
            let value = state.value.clone();
            tracing::debug!(%peer, document = %op.document, field = %op.field, timestamp = %op.timestamp, "admitted remote field op");
            self.log.append(op.clone(), false);
            self.emit(&op.document, &op.field, value, Origin::Remote(peer.clone()));
        }
        return Ok(changed);
    }

    /// The materialized value of every written field of a document.
    pub fn document_state(&self, document: &str) -> Option<Map<String, Value>> {
        let fields = self.documents.get(document)?;
        let mut state = Map::new();
        for (field, field_state) in fields {
            state.insert(field.clone(), field_state.value.clone());
        }
        return Some(state);
    }

    pub fn field_state(&self, document: &str, field: &str) -> Option<&FieldState> {
        return self.documents.get(document)?.get(field);
    }

    /// Ids of every document with at least one written field, sorted.
    pub fn documents(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.documents.keys().map(|k| k.as_str()).collect();
        ids.sort_unstable();
        return ids;
    }

    /// blake3 digest of a document's materialized state.
    pub fn document_digest(&self, document: &str) -> Option<Hash> {
        let state = self.document_state(document)?;
        return Some(hash(Value::Object(state).to_string().as_bytes()));
    }

    /// Retained operations stamped strictly after `timestamp`.
    pub fn operations_since(&self, timestamp: HlcTimestamp) -> Vec<FieldOp> {
        return self
            .log
            .entries()
            .filter(|e| e.op.timestamp > timestamp)
            .map(|e| e.op.clone())
            .collect();
    }

    /// Every retained operation, local and admitted remote, oldest first.
    pub fn operation_log(&self) -> Vec<FieldOp> {
        return self.log.ops();
    }

    /// Local operations not yet flushed to the transport.
    pub fn flush_ops(&mut self) -> Vec<FieldOp> {
        return self.log.take_unflushed();
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&FieldChange) + Send + 'static) -> SubscriptionId {
        return self.observers.subscribe(callback);
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        return self.observers.unsubscribe(id);
    }

    fn declared_kind(&self, document: &str, field: &str) -> Result<FieldKind> {
        return self.schema.get(field).ok_or_else(|| Error::UnregisteredField {
            document: document.to_string(),
            field: field.to_string(),
        });
    }

    /// The state of a field, created on first write. A field re-declared
    /// with a different kind starts over from that kind's initial value.
    fn state_mut<'a>(
        documents: &'a mut FxHashMap<String, BTreeMap<String, FieldState>>,
        document: &str,
        field: &str,
        kind: FieldKind,
    ) -> &'a mut FieldState {
        let state = documents
            .entry(document.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| FieldState::new(kind));
        if state.kind != kind {
            tracing::debug!(document, field, from = %state.kind, to = %kind, "field kind changed, resetting state");
            *state = FieldState::new(kind);
        }
        return state;
    }

    fn validate_remote(&self, op: &FieldOp) -> Result<()> {
        let kind = self.declared_kind(&op.document, &op.field)?;
        if kind != op.field_kind {
            return Err(Error::KindMismatch {
                field: op.field.clone(),
                expected: kind,
                found: op.field_kind,
            });
        }
        if !kind.accepts(&op.action) {
            return Err(Error::InvalidAction {
                field: op.field.clone(),
                kind,
                action: op.action.name(),
            });
        }
        if kind.is_counter() && op.counter.is_none() {
            return Err(Error::MissingCounter {
                field: op.field.clone(),
            });
        }
        return Ok(());
    }

    fn emit(&mut self, document: &str, field: &str, value: Value, origin: Origin) {
        if self.observers.is_empty() {
            return;
        }
        let change = FieldChange {
            document: document.to_string(),
            field: field.to_string(),
            value,
            origin,
        };
        self.observers.notify(&change);
    }
}
