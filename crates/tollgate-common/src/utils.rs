//! Utility functions for Tollgate
//!
//! Canonical JSON rendering and identifier validation shared by the differ,
//! the persistence backends, and the HTTP layer.

use std::sync::LazyLock;

use serde_json::{Map, Value};

/// Regex pattern for validating table identifiers (`schema.table`, `pending_offers`, ...)
static VALID_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:-]+$").expect("Invalid regex pattern"));

/// Validate a table identifier contains only allowed characters
///
/// Allowed characters: alphanumeric, underscore, dot, colon, hyphen
///
/// # Examples
///
/// ```
/// use tollgate_common::is_valid_identifier;
///
/// assert!(is_valid_identifier("pricing.bulletin_pricing"));
/// assert!(!is_valid_identifier("drop table;"));
/// assert!(!is_valid_identifier(""));
/// ```
pub fn is_valid_identifier(str: &str) -> bool {
    VALID_PATTERN.is_match(str)
}

/// Rebuild a JSON value with every object's keys in sorted order.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Serialize a JSON value with object keys sorted at every level.
///
/// Two values holding the same content render identically regardless of the
/// insertion order of their keys.
///
/// ```
/// use serde_json::json;
/// use tollgate_common::canonical_json;
///
/// assert_eq!(
///     canonical_json(&json!({"b": 1, "a": {"d": 2, "c": 3}})),
///     r#"{"a":{"c":3,"d":2},"b":1}"#
/// );
/// ```
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Render a primary-key value as a map key.
///
/// Strings are used verbatim so `"x"` and `x` agree; numbers and booleans use
/// their JSON text; composite keys fall back to canonical JSON.
pub fn scalar_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => canonical_json(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"name":"A","id":1,"tags":{"y":1,"x":2}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"id":1,"tags":{"x":2,"y":1},"name":"A"}"#).unwrap();
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn test_canonical_json_keeps_array_order() {
        assert_ne!(canonical_json(&json!([1, 2])), canonical_json(&json!([2, 1])));
    }

    #[test]
    fn test_scalar_key() {
        assert_eq!(scalar_key(&json!(1)), "1");
        assert_eq!(scalar_key(&json!("x")), "x");
        assert_eq!(scalar_key(&json!(true)), "true");
        assert_eq!(scalar_key(&json!({"b": 1, "a": 2})), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("pending_bulletin_pricing"));
        assert!(is_valid_identifier("finance.program_config"));
        assert!(!is_valid_identifier("a b"));
        assert!(!is_valid_identifier("x/y"));
    }

    proptest! {
        #[test]
        fn canonical_json_is_stable(keys in proptest::collection::btree_set("[a-z]{1,6}", 1..8)) {
            let forward: Map<String, Value> =
                keys.iter().enumerate().map(|(i, k)| (k.clone(), json!(i))).collect();
            let reversed: Map<String, Value> =
                keys.iter().enumerate().rev().map(|(i, k)| (k.clone(), json!(i))).collect();
            prop_assert_eq!(
                canonical_json(&Value::Object(forward)),
                canonical_json(&Value::Object(reversed))
            );
        }
    }
}
