//! Wire name <-> local name tables
//!
//! Each model declares one table pairing its local field names with the
//! provider's wire field names. The table is checked once when built: a
//! name may appear at most once on each side.

use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AliasError {
    #[error("{resource}: wire field '{wire}' is mapped more than once")]
    DuplicateWire {
        resource: &'static str,
        wire: &'static str,
    },
    #[error("{resource}: local field '{local}' is mapped more than once")]
    DuplicateLocal {
        resource: &'static str,
        local: &'static str,
    },
}

#[derive(Debug)]
pub struct AttributeTable {
    resource: &'static str,
    by_wire: HashMap<&'static str, &'static str>,
    by_local: HashMap<&'static str, &'static str>,
    order: Vec<&'static str>,
}

impl AttributeTable {
    /// Build a table from `(local, wire)` pairs
    pub fn new(
        resource: &'static str,
        pairs: &[(&'static str, &'static str)],
    ) -> Result<Self, AliasError> {
        let mut by_wire = HashMap::new();
        let mut by_local = HashMap::new();
        let mut order = Vec::with_capacity(pairs.len());

        for &(local, wire) in pairs {
            if by_wire.insert(wire, local).is_some() {
                return Err(AliasError::DuplicateWire { resource, wire });
            }
            if by_local.insert(local, wire).is_some() {
                return Err(AliasError::DuplicateLocal { resource, local });
            }
            order.push(local);
        }

        Ok(Self {
            resource,
            by_wire,
            by_local,
            order,
        })
    }

    pub fn local_name(&self, wire: &str) -> Option<&'static str> {
        self.by_wire.get(wire).copied()
    }

    pub fn wire_name(&self, local: &str) -> Option<&'static str> {
        self.by_local.get(local).copied()
    }

    /// Map a wire attribute set to `(local name, value)` pairs.
    /// Unknown wire fields are logged and skipped.
    pub fn decode<'a>(&self, data: &'a Map<String, Value>) -> Vec<(&'static str, &'a Value)> {
        data.iter()
            .filter_map(|(wire, value)| match self.local_name(wire) {
                Some(local) => Some((local, value)),
                None => {
                    tracing::debug!("{}: ignoring unknown attribute '{}'", self.resource, wire);
                    None
                }
            })
            .collect()
    }

    /// Build a wire attribute set from `(local name, value)` pairs, in table order
    pub fn encode(&self, values: &[(&'static str, Option<Value>)]) -> Map<String, Value> {
        let lookup: HashMap<&str, &Option<Value>> =
            values.iter().map(|(local, value)| (*local, value)).collect();

        self.order
            .iter()
            .filter_map(|local| {
                let value = lookup.get(local)?.as_ref()?;
                let wire = self.wire_name(local)?;
                Some((wire.to_string(), value.clone()))
            })
            .collect()
    }
}

/// Read a string attribute; numbers are accepted and stringified
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read an integer attribute; Compute Engine sends int64 values as strings
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> AttributeTable {
        AttributeTable::new(
            "disk",
            &[("name", "name"), ("size_gb", "sizeGb"), ("self_link", "selfLink")],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_both_directions() {
        let table = table();
        assert_eq!(table.local_name("sizeGb"), Some("size_gb"));
        assert_eq!(table.wire_name("self_link"), Some("selfLink"));
        assert_eq!(table.local_name("size_gb"), None);
    }

    #[test]
    fn test_duplicate_wire_is_rejected() {
        let err = AttributeTable::new("disk", &[("a", "x"), ("b", "x")]).unwrap_err();
        assert_eq!(
            err,
            AliasError::DuplicateWire {
                resource: "disk",
                wire: "x"
            }
        );
    }

    #[test]
    fn test_duplicate_local_is_rejected() {
        let err = AttributeTable::new("disk", &[("a", "x"), ("a", "y")]).unwrap_err();
        assert!(matches!(err, AliasError::DuplicateLocal { local: "a", .. }));
    }

    #[test]
    fn test_decode_skips_unknown() {
        let data = json!({"name": "d", "sizeGb": "10", "users": []});
        let decoded = table().decode(data.as_object().unwrap());
        assert_eq!(decoded.len(), 2);
        assert!(decoded.iter().all(|(local, _)| *local != "users"));
    }

    #[test]
    fn test_encode_uses_wire_names_and_skips_unset() {
        let map = table().encode(&[
            ("name", Some(json!("d"))),
            ("size_gb", None),
            ("self_link", Some(json!("https://x"))),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["selfLink"], "https://x");
    }

    #[test]
    fn test_value_readers() {
        assert_eq!(as_u64(&json!("25")), Some(25));
        assert_eq!(as_u64(&json!(25)), Some(25));
        assert_eq!(as_u64(&json!("x")), None);
        assert_eq!(as_string(&json!(7)), Some("7".to_string()));
        assert_eq!(as_string(&json!(null)), None);
    }
}
