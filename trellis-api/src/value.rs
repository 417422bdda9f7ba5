//! Structured value type shared by the script and native sides.
//!
//! `Value` is the only shape allowed across the script/native boundary: no
//! integer/float split, no bytes, no handles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key-ordered map of structured values.
pub type Map = BTreeMap<String, Value>;

/// A language-agnostic value that can cross the script/native boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// All numbers are IEEE-754 doubles.
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The number as an integer, if it is integral and fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        let n = self.as_f64()?;
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            Some(n as i64)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Convert to a `serde_json::Value`. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    fn write_text(&self, buf: &mut String) {
        match self {
            Value::Null => buf.push_str("null"),
            Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => write_number(*n, buf),
            Value::String(s) => write_string(s, buf),
            Value::List(items) => {
                buf.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    item.write_text(buf);
                }
                buf.push(']');
            }
            Value::Map(map) => {
                buf.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    write_string(key, buf);
                    buf.push(':');
                    value.write_text(buf);
                }
                buf.push('}');
            }
        }
    }
}

/// Largest integer a double represents exactly (2^53).
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn write_number(n: f64, buf: &mut String) {
    if !n.is_finite() {
        buf.push_str("null");
    } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        buf.push_str(&(n as i64).to_string());
    } else {
        buf.push_str(&n.to_string());
    }
}

fn write_string(s: &str, buf: &mut String) {
    match serde_json::to_string(s) {
        Ok(quoted) => buf.push_str(&quoted),
        Err(_) => buf.push_str(&format!("{:?}", s)),
    }
}

/// Compact JSON-like text (`{"a":1,"b":[true,null]}`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();
        self.write_text(&mut buf);
        f.write_str(&buf)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

// Convenient conversions
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "null");
        assert_eq!(Value::from("a\"b").to_string(), r#""a\"b""#);
    }

    #[test]
    fn test_display_nested() {
        let value: Value = [
            ("b", Value::from(vec![Value::Bool(false), Value::Null])),
            ("a", Value::Number(1.0)),
        ]
        .into_iter()
        .collect();
        // Keys are ordered.
        assert_eq!(value.to_string(), r#"{"a":1,"b":[false,null]}"#);
    }

    #[test]
    fn test_from_json_roundtrip() {
        let json = serde_json::json!({"tag": 3, "props": {"opacity": 0.5}, "list": [1, "x"]});
        let value = Value::from(json.clone());
        assert_eq!(value.get("tag"), Some(&Value::Number(3.0)));
        assert_eq!(
            value.to_json(),
            serde_json::json!({"tag": 3.0, "props": {"opacity": 0.5}, "list": [1.0, "x"]})
        );
    }

    #[test]
    fn test_serde_untagged() {
        let value: Value = serde_json::from_str(r#"{"a":[1,true,null,"s"]}"#).unwrap();
        let expected: Value = [(
            "a",
            Value::List(vec![Value::Number(1.0), Value::Bool(true), Value::Null, Value::from("s")]),
        )]
        .into_iter()
        .collect();
        assert_eq!(value, expected);
        assert_eq!(serde_json::to_string(&expected).unwrap(), r#"{"a":[1.0,true,null,"s"]}"#);
    }

    #[test]
    fn test_as_i64_rejects_fractions() {
        assert_eq!(Value::Number(7.0).as_i64(), Some(7));
        assert_eq!(Value::Number(7.5).as_i64(), None);
        assert_eq!(Value::from("7").as_i64(), None);
    }
}
