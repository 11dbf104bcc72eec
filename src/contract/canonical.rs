//! Deterministic JSON form used to compare two response bodies.
//!
//! Object members whose value is `null` are dropped, recursively. Nulls inside
//! arrays stay where they are, since array positions carry meaning. Keys are
//! emitted in sorted order. Numbers keep their exact text (serde_json's
//! `arbitrary_precision`), so large integers and out-of-range exponents are
//! neither rounded nor rejected.

use serde_json::{Map, Value};

/// Canonical bytes for `body`, or `None` when it is absent or not JSON.
#[must_use]
pub fn canonicalize(body: Option<&[u8]>) -> Option<Vec<u8>> {
    let value: Value = serde_json::from_slice(body?).ok()?;
    serde_json::to_vec(&normalize(value)).ok()
}

/// Same as [`canonicalize`], as a string.
#[must_use]
pub fn canonical_string(body: Option<&[u8]>) -> Option<String> {
    canonicalize(body).and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Prunes null object members. Key order comes from `serde_json::Map`, which
/// is a `BTreeMap` unless `preserve_order` is enabled, so keys are re-inserted
/// in sorted order explicitly.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<(String, Value)> = object
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .map(|(key, value)| (key, normalize(value)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, value);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        scalar => scalar,
    }
}
