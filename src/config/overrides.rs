//! Merging user-supplied overrides into a configuration document.
use serde_json::{Map, Value};

/// Key which, when present in an override table, replaces the base table instead of merging
const REPLACE_KEY: &str = "_replace";

/// Merge `overrides` into `base`.
///
/// Tables are merged recursively. If an override table contains the key `_replace`, it replaces
/// the corresponding base table wholesale (minus the `_replace` key). Any other value overwrites
/// the base value and keys missing from `base` are added.
pub fn merge_overrides(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (_, Value::Object(overrides)) if overrides.contains_key(REPLACE_KEY) => {
            Value::Object(strip_replace_key(overrides))
        }
        (Value::Object(mut base), Value::Object(overrides)) => {
            merge_tables(&mut base, overrides);
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}

fn merge_tables(base: &mut Map<String, Value>, overrides: Map<String, Value>) {
    for (key, value) in overrides {
        let merged = match base.get_mut(&key) {
            Some(existing) => merge_overrides(existing.take(), value),
            None => match value {
                Value::Object(table) => Value::Object(strip_replace_key(table)),
                value => value,
            },
        };
        base.insert(key, merged);
    }
}

fn strip_replace_key(mut table: Map<String, Value>) -> Map<String, Value> {
    table.retain(|key, _| key != REPLACE_KEY);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({"a": 1, "b": 2}), json!({"b": 3}), json!({"a": 1, "b": 3}))]
    #[case(json!({"a": 1, "b": {"x": 10}}), json!({"b": {"y": 20}}), json!({"a": 1, "b": {"x": 10, "y": 20}}))]
    #[case(json!({"a": 1, "b": {"x": 10}}), json!({"b": {"_replace": true, "y": 20}}), json!({"a": 1, "b": {"y": 20}}))]
    #[case(json!({"a": 1}), json!({"b": 2}), json!({"a": 1, "b": 2}))]
    #[case(json!({"a": 1, "b": 2}), json!({"_replace": true, "c": 3}), json!({"c": 3}))]
    #[case(json!({"a": {"x": 1}}), json!({"a": 5}), json!({"a": 5}))]
    #[case(json!({"a": 5}), json!({"a": {"x": 1}}), json!({"a": {"x": 1}}))]
    #[case(json!({"a": 1}), json!({}), json!({"a": 1}))]
    fn test_merge_overrides(#[case] base: Value, #[case] overrides: Value, #[case] expected: Value) {
        assert_eq!(merge_overrides(base, overrides), expected);
    }

    #[test]
    fn test_merge_overrides_nested_replace() {
        let base = json!({"models": {"Thermal": {"fuel": "coal", "type": "ST"}, "Hydro": {}}});
        let overrides = json!({"models": {"Thermal": {"_replace": 1, "fuel": "gas"}}});
        assert_eq!(
            merge_overrides(base, overrides),
            json!({"models": {"Thermal": {"fuel": "gas"}, "Hydro": {}}})
        );
    }

    #[test]
    fn test_merge_overrides_new_table_loses_replace_key() {
        let merged = merge_overrides(json!({}), json!({"new": {"_replace": true, "x": 1}}));
        assert_eq!(merged, json!({"new": {"x": 1}}));
    }
}
