//! Bidirectional conversion between nested terminology values and dot-path
//! flat maps.
//!
//! Round-trip law: `unflatten(flatten(x)) == x` for any mapping-rooted value
//! whose path segments are non-empty and whose leaves are scalars.

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::types::TerminologyValue;

/// Validate a dot-path key: non-empty, no empty segments.
pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey);
    }
    if key.split('.').any(|segment| segment.is_empty()) {
        return Err(ValidationError::MalformedKey {
            key: key.to_string(),
            reason: "empty path segment".to_string(),
        });
    }
    Ok(())
}

/// Flatten a nested mapping into a dot-path map with scalar leaves.
///
/// Empty nested maps have no leaves and therefore vanish; the round-trip law
/// holds for inputs without them.
pub fn flatten(nested: &BTreeMap<String, TerminologyValue>) -> BTreeMap<String, TerminologyValue> {
    let mut flat = BTreeMap::new();
    for (key, value) in nested {
        flatten_into(key, value, &mut flat);
    }
    flat
}

fn flatten_into(prefix: &str, value: &TerminologyValue, flat: &mut BTreeMap<String, TerminologyValue>) {
    match value {
        TerminologyValue::Map(map) => {
            for (key, child) in map {
                flatten_into(&format!("{}.{}", prefix, key), child, flat);
            }
        }
        scalar => {
            flat.insert(prefix.to_string(), scalar.clone());
        }
    }
}

/// Rebuild a nested mapping from a dot-path flat map.
///
/// A scalar and a deeper path competing for the same segment (e.g. `a` and
/// `a.b`) cannot both be represented; the deeper path wins and the scalar is
/// dropped. Well-formed inputs (as produced by `flatten`) never collide.
pub fn unflatten(flat: &BTreeMap<String, TerminologyValue>) -> BTreeMap<String, TerminologyValue> {
    let mut nested = BTreeMap::new();
    for (key, value) in flat {
        let segments: Vec<&str> = key.split('.').collect();
        insert_path(&mut nested, &segments, value);
    }
    nested
}

fn insert_path(
    target: &mut BTreeMap<String, TerminologyValue>,
    segments: &[&str],
    value: &TerminologyValue,
) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };
    if rest.is_empty() {
        // Never clobber an existing subtree with a scalar leaf.
        if !matches!(target.get(*head), Some(TerminologyValue::Map(_))) {
            target.insert(head.to_string(), value.clone());
        }
        return;
    }
    let child = target
        .entry(head.to_string())
        .or_insert_with(TerminologyValue::empty_map);
    if !child.is_map() {
        *child = TerminologyValue::empty_map();
    }
    if let TerminologyValue::Map(map) = child {
        insert_path(map, rest, value);
    }
}
