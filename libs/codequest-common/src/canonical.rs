/// Canonical serialization used for output comparison
///
/// **Rules:**
/// - Object keys are sorted lexicographically: `{a:1,b:2}` == `{b:2,a:1}`
/// - Floats with no fractional part inside ±2^53 encode as integers: `2.0` == `2`
/// - Compact encoding, no whitespace
/// - Array order is significant
///
/// Both sides of a comparison go through the same encoder, so equality is a
/// byte comparison of the encodings.
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Largest integer a double represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn normalize_number(number: &Number) -> Number {
    if number.is_i64() || number.is_u64() {
        return number.clone();
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Number::from(f as i64),
        _ => number.clone(),
    }
}

fn normalize(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(fields) => {
            let sorted: BTreeMap<&String, Value> =
                fields.iter().map(|(k, v)| (k, normalize(v))).collect();
            let mut map = Map::new();
            for (k, v) in sorted {
                map.insert(k.clone(), v);
            }
            Value::Object(map)
        }
        other => other.clone(),
    }
}

/// Encode a value in canonical form
pub fn canonical_json(value: &Value) -> String {
    // Serializing a `Value` cannot fail: keys are strings and numbers are finite.
    serde_json::to_string(&normalize(value)).unwrap_or_default()
}

/// Structural equality over canonical encodings
pub fn values_equal(a: &Value, b: &Value) -> bool {
    canonical_json(a) == canonical_json(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_is_ignored() {
        let a = json!({"a": 1, "b": 2});
        let b: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        assert!(values_equal(&a, &b));
        assert_eq!(canonical_json(&b), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let value = json!({"z": {"y": 1, "x": [ {"d": 1, "c": 2} ]}, "a": null});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":null,"z":{"x":[{"c":2,"d":1}],"y":1}}"#
        );
    }

    #[test]
    fn test_integral_floats_match_integers() {
        assert!(values_equal(&json!(2.0), &json!(2)));
        assert!(values_equal(&json!([1.0, -3.0]), &json!([1, -3])));
        assert!(!values_equal(&json!(2.5), &json!(2)));
    }

    #[test]
    fn test_huge_floats_are_left_alone() {
        assert_eq!(canonical_json(&json!(1e300)), "1e+300");
    }

    #[test]
    fn test_array_order_matters() {
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
    }

    #[test]
    fn test_types_are_distinct() {
        assert!(!values_equal(&json!("1"), &json!(1)));
        assert!(!values_equal(&json!(null), &json!(false)));
        assert!(!values_equal(&json!([]), &json!({})));
    }
}
