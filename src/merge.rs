//! Override-aware deep merge of terminology values.
//!
//! Pure functions, no I/O. The resolver folds ancestor-to-descendant entries
//! through `deep_merge`; `suggest` entries never reach the accumulator (the
//! resolver records them separately).

use std::collections::BTreeMap;

use crate::types::{OverrideBehavior, TerminologyValue};

/// Merge `override_value` into `base` according to `behavior`.
///
/// - `Replace`: `override_value` entirely supersedes `base`.
/// - `Merge`: when both sides are mappings, keys are combined recursively
///   (override keys win on scalar conflicts); otherwise behaves like
///   `Replace`.
/// - `Suggest`: `base` is returned unchanged. Recording the suggestion is
///   the caller's job, not this function's.
pub fn deep_merge(
    base: TerminologyValue,
    override_value: TerminologyValue,
    behavior: OverrideBehavior,
) -> TerminologyValue {
    match behavior {
        OverrideBehavior::Replace => override_value,
        OverrideBehavior::Suggest => base,
        OverrideBehavior::Merge => match (base, override_value) {
            (TerminologyValue::Map(base_map), TerminologyValue::Map(override_map)) => {
                TerminologyValue::Map(merge_maps(base_map, override_map))
            }
            (_, override_value) => override_value,
        },
    }
}

fn merge_maps(
    mut base: BTreeMap<String, TerminologyValue>,
    override_map: BTreeMap<String, TerminologyValue>,
) -> BTreeMap<String, TerminologyValue> {
    for (key, override_value) in override_map {
        match base.remove(&key) {
            Some(base_value) => {
                base.insert(
                    key,
                    deep_merge(base_value, override_value, OverrideBehavior::Merge),
                );
            }
            None => {
                base.insert(key, override_value);
            }
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, TerminologyValue)>) -> TerminologyValue {
        TerminologyValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_replace_wins_regardless_of_base() {
        let base = map(vec![("x", 1.0.into()), ("y", 2.0.into())]);
        let override_value = map(vec![("z", 3.0.into())]);
        let merged = deep_merge(base, override_value.clone(), OverrideBehavior::Replace);
        assert_eq!(merged, override_value);
    }

    #[test]
    fn test_merge_combines_sibling_keys() {
        let base = map(vec![("a", map(vec![("x", 1.0.into())]))]);
        let override_value = map(vec![("a", map(vec![("y", 2.0.into())]))]);
        let merged = deep_merge(base, override_value, OverrideBehavior::Merge);
        assert_eq!(
            merged,
            map(vec![(
                "a",
                map(vec![("x", 1.0.into()), ("y", 2.0.into())])
            )])
        );
    }

    #[test]
    fn test_merge_override_wins_on_scalar_conflict() {
        let base = map(vec![("a", map(vec![("x", "old".into())]))]);
        let override_value = map(vec![("a", map(vec![("x", "new".into())]))]);
        let merged = deep_merge(base, override_value, OverrideBehavior::Merge);
        assert_eq!(merged, map(vec![("a", map(vec![("x", "new".into())]))]));
    }

    #[test]
    fn test_merge_on_scalars_degrades_to_replace() {
        let merged = deep_merge("Step".into(), "Milestone".into(), OverrideBehavior::Merge);
        assert_eq!(merged, "Milestone".into());
    }

    #[test]
    fn test_merge_scalar_over_map_replaces() {
        let base = map(vec![("x", 1.0.into())]);
        let merged = deep_merge(base, "flat".into(), OverrideBehavior::Merge);
        assert_eq!(merged, "flat".into());
    }

    #[test]
    fn test_suggest_leaves_base_untouched() {
        let base = map(vec![("x", 1.0.into())]);
        let merged = deep_merge(
            base.clone(),
            map(vec![("y", 2.0.into())]),
            OverrideBehavior::Suggest,
        );
        assert_eq!(merged, base);
    }

    #[test]
    fn test_merge_recurses_multiple_levels() {
        let base = map(vec![(
            "terms",
            map(vec![("unit", map(vec![("singular", "Step".into())]))]),
        )]);
        let override_value = map(vec![(
            "terms",
            map(vec![("unit", map(vec![("plural", "Steps".into())]))]),
        )]);
        let merged = deep_merge(base, override_value, OverrideBehavior::Merge);
        assert_eq!(
            merged,
            map(vec![(
                "terms",
                map(vec![(
                    "unit",
                    map(vec![("singular", "Step".into()), ("plural", "Steps".into())])
                )])
            )])
        );
    }
}
