// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Replica configuration and field schemas.
//!
//! Both load from JSON so the owning collection wrapper can keep them next
//! to the rest of its settings:
//!
//! ```
//! use pocket_crdt::config::Config;
//! use pocket_crdt::config::FieldSchema;
//! use pocket_crdt::crdt::field::FieldKind;
//!
//! let config = Config::from_json(r#"{ "nodeId": "laptop", "maxLogSize": 64 }"#).unwrap();
//! assert_eq!(config.max_log_size, 64);
//!
//! let schema = FieldSchema::from_json(r#"{ "title": "lww-register", "likes": "g-counter" }"#).unwrap();
//! assert_eq!(schema.get("likes"), Some(FieldKind::GCounter));
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::crdt::field::FieldKind;
use crate::error::Result;
use crate::log::DEFAULT_MAX_LOG_SIZE;
use crate::node::NodeId;

/// Settings for one replica.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Replica identity. A random id is generated when absent.
    pub node_id: Option<NodeId>,
    /// Operations retained in the outgoing log before the oldest are evicted.
    pub max_log_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        return Config {
            node_id: None,
            max_log_size: DEFAULT_MAX_LOG_SIZE,
        };
    }
}

impl Config {
    pub fn new(node: impl Into<NodeId>) -> Config {
        return Config {
            node_id: Some(node.into()),
            ..Config::default()
        };
    }

    pub fn with_max_log_size(mut self, max_log_size: usize) -> Config {
        self.max_log_size = max_log_size;
        return self;
    }

    pub fn from_json(input: &str) -> Result<Config> {
        return Ok(serde_json::from_str(input)?);
    }

    /// The configured node id, or a freshly generated one.
    pub fn node(&self) -> NodeId {
        return match &self.node_id {
            Some(node) => node.clone(),
            None => NodeId::generate(),
        };
    }
}

/// Field name to CRDT kind declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: BTreeMap<String, FieldKind>,
}

impl FieldSchema {
    pub fn new() -> FieldSchema {
        return FieldSchema::default();
    }

    /// Builder form of `insert`.
    pub fn with(mut self, field: impl Into<String>, kind: FieldKind) -> FieldSchema {
        self.insert(field, kind);
        return self;
    }

    pub fn insert(&mut self, field: impl Into<String>, kind: FieldKind) {
        self.fields.insert(field.into(), kind);
    }

    pub fn get(&self, field: &str) -> Option<FieldKind> {
        return self.fields.get(field).copied();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        return self.fields.iter().map(|(k, v)| (k.as_str(), *v));
    }

    pub fn len(&self) -> usize {
        return self.fields.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.fields.is_empty();
    }

    pub fn from_json(input: &str) -> Result<FieldSchema> {
        return Ok(serde_json::from_str(input)?);
    }
}

impl<S: Into<String>> FromIterator<(S, FieldKind)> for FieldSchema {
    fn from_iter<I: IntoIterator<Item = (S, FieldKind)>>(iter: I) -> FieldSchema {
        let mut schema = FieldSchema::new();
        for (field, kind) in iter {
            schema.insert(field, kind);
        }
        return schema;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.node_id, None);
        assert_eq!(config.max_log_size, DEFAULT_MAX_LOG_SIZE);
    }

    #[test]
    fn configured_node_is_stable() {
        let config = Config::new("tab-1").with_max_log_size(10);
        assert_eq!(config.node(), NodeId::new("tab-1"));
        assert_eq!(config.node(), config.node());
        assert_eq!(config.max_log_size, 10);
    }

    #[test]
    fn missing_node_is_generated() {
        let config = Config::default();
        assert_ne!(config.node(), config.node());
    }

    #[test]
    fn schema_rejects_unknown_kinds() {
        let result = FieldSchema::from_json(r#"{ "tags": "two-phase-set" }"#);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn schema_round_trips() {
        let schema: FieldSchema = [("tags", FieldKind::OrSet), ("meta", FieldKind::LwwMap)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"{"meta":"lww-map","tags":"or-set"}"#);
        assert_eq!(FieldSchema::from_json(&json).unwrap(), schema);
    }
}
