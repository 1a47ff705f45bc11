//! Conversions between JSON values and Rhai `Dynamic` values.
//!
//! Inputs are rebuilt from JSON on every call, so script code only ever
//! sees its own copy. Outputs are converted back to JSON before they leave
//! the sandbox.

use rhai::{Array, Dynamic, Engine, ImmutableString, Map, FLOAT, INT};
use serde_json::{Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConversionError {
    #[error("cannot return a value of type '{0}'")]
    Unsupported(String),
}

impl ConversionError {
    /// Swap Rust type paths for the names scripts see (`Console`, `unavailable`)
    pub fn for_script(self, engine: &Engine) -> Self {
        match self {
            ConversionError::Unsupported(name) => {
                ConversionError::Unsupported(engine.map_type_name(&name).to_string())
            }
        }
    }
}

/// Converts a JSON value into a fresh Rhai value.
///
/// Integers outside the `INT` range fall back to `FLOAT`.
pub fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Dynamic::from(i as INT),
            None => Dynamic::from(n.as_f64().unwrap_or(f64::NAN) as FLOAT),
        },
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            let array: Array = items.iter().map(json_to_dynamic).collect();
            Dynamic::from_array(array)
        }
        Value::Object(fields) => {
            let mut map = Map::new();
            for (k, v) in fields {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from_map(map)
        }
    }
}

/// Converts a Rhai value into JSON.
///
/// `()` becomes `null` and non-finite floats become `null`, mirroring
/// `JSON.stringify`. Function pointers and host objects are rejected.
pub fn dynamic_to_json(value: &Dynamic) -> Result<Value, ConversionError> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(Value::Number(Number::from(i)));
    }
    if let Ok(f) = value.as_float() {
        return Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null));
    }
    if let Ok(c) = value.as_char() {
        return Ok(Value::String(c.to_string()));
    }
    if let Some(s) = value.read_lock::<ImmutableString>() {
        return Ok(Value::String(s.to_string()));
    }
    if let Some(items) = value.read_lock::<Array>() {
        let converted = items
            .iter()
            .map(dynamic_to_json)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::Array(converted));
    }
    if let Some(fields) = value.read_lock::<Map>() {
        let mut object = serde_json::Map::new();
        for (k, v) in fields.iter() {
            object.insert(k.to_string(), dynamic_to_json(v)?);
        }
        return Ok(Value::Object(object));
    }
    Err(ConversionError::Unsupported(value.type_name().to_string()))
}

/// Converts a function's return value into an optional output: a bare `()`
/// means "no value", like a function that returns nothing.
pub fn output_from_dynamic(value: &Dynamic) -> Result<Option<Value>, ConversionError> {
    if value.is_unit() {
        return Ok(None);
    }
    dynamic_to_json(value).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert!(json_to_dynamic(&json!(null)).is_unit());
        assert_eq!(json_to_dynamic(&json!(true)).as_bool(), Ok(true));
        assert_eq!(json_to_dynamic(&json!(7)).as_int(), Ok(7));
        assert_eq!(json_to_dynamic(&json!(1.5)).as_float(), Ok(1.5));
        assert_eq!(json_to_dynamic(&json!("hi")).into_string().unwrap(), "hi");
    }

    #[test]
    fn test_u64_beyond_int_range_becomes_float() {
        let big = json!(u64::MAX);
        assert!(json_to_dynamic(&big).is_float());
    }

    #[test]
    fn test_nested_structures() {
        let value = json!({"list": [1, "two", {"three": 3.5}], "flag": false, "none": null});
        assert_eq!(dynamic_to_json(&json_to_dynamic(&value)).unwrap(), value);
    }

    #[test]
    fn test_char_becomes_string() {
        assert_eq!(dynamic_to_json(&Dynamic::from('x')).unwrap(), json!("x"));
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(dynamic_to_json(&Dynamic::from(f64::NAN)).unwrap(), Value::Null);
        assert_eq!(dynamic_to_json(&Dynamic::from(f64::INFINITY)).unwrap(), Value::Null);
    }

    #[test]
    fn test_unit_output_is_absent() {
        assert_eq!(output_from_dynamic(&Dynamic::UNIT).unwrap(), None);
        assert_eq!(output_from_dynamic(&Dynamic::from(0 as INT)).unwrap(), Some(json!(0)));
    }

    #[test]
    fn test_nested_unit_is_null() {
        let array = Dynamic::from_array(vec![Dynamic::UNIT, Dynamic::from(1 as INT)]);
        assert_eq!(dynamic_to_json(&array).unwrap(), json!([null, 1]));
    }

    #[test]
    fn test_function_pointer_is_rejected() {
        let ptr = Dynamic::from(rhai::FnPtr::new("main").unwrap());
        let err = dynamic_to_json(&ptr).unwrap_err();
        assert!(err.to_string().contains("Fn"));
    }

    #[test]
    fn test_host_type_name_is_mapped() {
        #[derive(Clone)]
        struct Handle;

        let mut engine = Engine::new_raw();
        engine.register_type_with_name::<Handle>("Handle");

        let err = dynamic_to_json(&Dynamic::from(Handle)).unwrap_err();
        assert!(err.to_string().contains("::Handle"));
        assert_eq!(
            err.for_script(&engine).to_string(),
            "cannot return a value of type 'Handle'"
        );
    }

    #[test]
    fn test_conversion_copies_input() {
        let input = json!([1, 2, 3]);
        let copy = json_to_dynamic(&input);
        let mut array = copy.into_array().unwrap();
        array.push(Dynamic::from(4 as INT));
        assert_eq!(input, json!([1, 2, 3]));
    }
}
