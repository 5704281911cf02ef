//! Recursive flattening of nested JSON into a [`FlatRecord`].
//!
//! Nested keys are joined with `_`, and sequence elements are keyed by their
//! index, so
//!
//! ```text
//! {"top": 1, "a": {"b": 5}, "identifier": [{"value": "u1"}]}
//! ```
//!
//! becomes
//!
//! ```text
//! {"top": 1, "a_b": 5, "identifier_0_value": "u1"}
//! ```
//!
//! When two branches produce the same flat key the one visited last wins.

use serde_json::Value;

use crate::value::{FlatRecord, Node};

/// Flatten a mapping or sequence into a single-level record.
///
/// A scalar at the top level is stored under `prefix` itself, or dropped
/// when `prefix` is empty since there is no key to give it.
pub fn flatten(value: &Value, prefix: &str) -> FlatRecord {
    let mut flat = FlatRecord::new();
    flatten_into(&mut flat, Node::from(value), prefix);
    flat
}

/// Flatten `node` into `flat`, overwriting any keys already present.
pub(crate) fn flatten_into(flat: &mut FlatRecord, node: Node<'_>, prefix: &str) {
    match node {
        Node::Mapping(map) => {
            flatten_entries(flat, map.iter().map(|(k, v)| (k.as_str(), v)), prefix);
        }
        Node::Sequence(items) => {
            for (index, value) in items.iter().enumerate() {
                visit(flat, prefix, &index.to_string(), value);
            }
        }
        Node::Scalar(_) => {
            if !prefix.is_empty()
                && let Some(leaf) = node.to_flat_value()
            {
                flat.insert(prefix.to_string(), leaf);
            }
        }
    }
}

/// Flatten a stream of key/value entries, as if they formed one mapping.
pub fn flatten_entries<'a, I>(flat: &mut FlatRecord, entries: I, prefix: &str)
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    for (key, value) in entries {
        visit(flat, prefix, key, value);
    }
}

fn visit(flat: &mut FlatRecord, prefix: &str, key: &str, value: &Value) {
    let key = join_key(prefix, key);
    let node = Node::from(value);
    match node.to_flat_value() {
        Some(leaf) => {
            flat.insert(key, leaf);
        }
        None => flatten_into(flat, node, &key),
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}_{key}")
    }
}

/// Re-express a flat record as a JSON object.
///
/// Flattening the result with an empty prefix yields the same keys and
/// values, since nothing in it nests.
pub fn to_json_object(flat: &FlatRecord) -> Value {
    Value::Object(
        flat.iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

/// Merge `other` into `target`; keys already in `target` are overwritten in place.
pub fn merge(target: &mut FlatRecord, other: FlatRecord) {
    for (key, value) in other {
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FlatValue;
    use serde_json::json;

    #[test]
    fn test_nested_mapping() {
        let flat = flatten(&json!({"top": 1, "a": {"b": 5}}), "");
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["top"], FlatValue::from(1i64));
        assert_eq!(flat["a_b"], FlatValue::from(5i64));
    }

    #[test]
    fn test_sequence_uses_indices() {
        let flat = flatten(
            &json!({"identifier": [{"value": "u1"}, {"value": "u2"}]}),
            "",
        );
        assert_eq!(flat["identifier_0_value"], FlatValue::from("u1"));
        assert_eq!(flat["identifier_1_value"], FlatValue::from("u2"));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_top_level_sequence() {
        let flat = flatten(&json!(["x", {"y": true}]), "");
        assert_eq!(flat["0"], FlatValue::from("x"));
        assert_eq!(flat["1_y"], FlatValue::Bool(true));
    }

    #[test]
    fn test_prefix_is_applied() {
        let flat = flatten(&json!({"name": "blood-glucose"}), "schema_id");
        assert_eq!(flat["schema_id_name"], FlatValue::from("blood-glucose"));
    }

    #[test]
    fn test_empty_containers_contribute_nothing() {
        let flat = flatten(&json!({"a": {}, "b": [], "c": null}), "");
        assert_eq!(flat.len(), 1);
        assert!(flat["c"].is_null());
    }

    #[test]
    fn test_scalar_root() {
        assert!(flatten(&json!(5), "").is_empty());
        assert_eq!(flatten(&json!(5), "n")["n"], FlatValue::from(5i64));
    }

    #[test]
    fn test_later_branch_wins_collision() {
        // "a_b" arrives first as a literal key, then again via nesting
        let flat = flatten(&json!({"a_b": 1, "a": {"b": 2}}), "");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["a_b"], FlatValue::from(2i64));
    }

    #[test]
    fn test_keys_keep_visit_order() {
        let flat = flatten(&json!({"z": 1, "a": {"y": 2, "b": 3}, "m": 4}), "");
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a_y", "a_b", "m"]);
    }

    #[test]
    fn test_reflattening_is_a_no_op() {
        let tree = json!({
            "resourceType": "Observation",
            "meta": {"lastUpdated": "2025-03-12T16:00:50.952478Z"},
            "identifier": [{"value": "u-u-i-d-4", "system": "https://commonhealth.org"}],
            "code": {"coding": [{"code": "omh:blood-glucose:4.0"}]},
        });
        let once = flatten(&tree, "");
        let twice = flatten(&to_json_object(&once), "");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_overwrites_in_place() {
        let mut target = flatten(&json!({"a": 1, "b": 2}), "");
        merge(&mut target, flatten(&json!({"a": 3, "c": 4}), ""));
        let keys: Vec<&str> = target.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "b", "c"]);
        assert_eq!(target["a"], FlatValue::from(3i64));
    }
}
