//! Conversion between rhai values and the bridge's structured `Value`.
//!
//! Integral numbers inside the safe-integer range become rhai `INT`s so
//! scripts can index with them; everything else is a `FLOAT`. Functions and
//! custom types never cross the boundary.

use rhai::{Array, Dynamic, FLOAT, INT, Map as ScriptMap};
use trellis_api::{MAX_SAFE_INTEGER, Map, Value};

use crate::error::MarshalError;

/// Maximum list/map nesting accepted in either direction. Cyclic script
/// structures surface as `DepthExceeded`.
pub const MAX_DEPTH: usize = 128;

/// Converts an engine value into a structured `Value`.
pub fn to_structured(value: &Dynamic) -> Result<Value, MarshalError> {
    convert_out(value, 0)
}

/// Converts a structured `Value` into an engine value.
pub fn from_structured(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Number(n) => number_in(*n),
        Value::String(s) => Dynamic::from(s.clone()),
        Value::List(items) => Dynamic::from_array(items.iter().map(from_structured).collect()),
        Value::Map(map) => {
            let converted: ScriptMap = map
                .iter()
                .map(|(k, v)| (k.as_str().into(), from_structured(v)))
                .collect();
            Dynamic::from_map(converted)
        }
    }
}

fn number_in(n: f64) -> Dynamic {
    let integral = n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER;
    let negative_zero = n == 0.0 && n.is_sign_negative();
    if integral && !negative_zero {
        Dynamic::from_int(n as INT)
    } else {
        Dynamic::from_float(n as FLOAT)
    }
}

fn convert_out(value: &Dynamic, depth: usize) -> Result<Value, MarshalError> {
    if depth > MAX_DEPTH {
        return Err(MarshalError::DepthExceeded { limit: MAX_DEPTH });
    }
    if value.is_shared() {
        return convert_out(&value.flatten_clone(), depth + 1);
    }

    if value.is_unit() {
        return Ok(Value::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(Value::Number(i as f64));
    }
    if let Ok(f) = value.as_float() {
        return Ok(Value::Number(f as f64));
    }
    if let Ok(c) = value.as_char() {
        return Ok(Value::String(c.to_string()));
    }
    if value.is_string() {
        let s = value
            .clone()
            .into_string()
            .map_err(|type_name| unsupported(type_name))?;
        return Ok(Value::String(s));
    }
    if let Some(items) = value.read_lock::<Array>() {
        let converted = items
            .iter()
            .map(|item| convert_out(item, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::List(converted));
    }
    if let Some(entries) = value.read_lock::<ScriptMap>() {
        let mut converted = Map::new();
        for (key, item) in entries.iter() {
            converted.insert(key.to_string(), convert_out(item, depth + 1)?);
        }
        return Ok(Value::Map(converted));
    }

    Err(unsupported(value.type_name()))
}

fn unsupported(type_name: &str) -> MarshalError {
    MarshalError::UnsupportedType {
        type_name: type_name.to_string(),
    }
}
