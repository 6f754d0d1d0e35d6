//! JSON encode/decode pair used by the wire format.
//!
//! Output is deterministic: object keys are sorted at every depth and no
//! whitespace is emitted, so encoded problems compare and log stably.

use crate::problem::WireError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Parses `text` into a JSON object.
pub fn loads(text: &str) -> Result<Map<String, Value>, WireError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        _ => Err(WireError::NotAnObject),
    }
}

/// Encodes any serializable value deterministically.
pub fn dumps<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_value(value).map(|v| dumps_value(&v))
}

/// Encodes a JSON value deterministically.
#[must_use]
pub fn dumps_value(value: &Value) -> String {
    let mut out = String::new();
    write_sorted(&mut out, value);
    out
}

fn write_sorted(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_sorted(out, value);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_sorted(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
