//! Field descriptors for problem content.
//!
//! A [`FieldSpec`] declares one named, typed, documented parameter of a
//! problem type. Specs are built once, when the owning type is declared, and
//! are immutable afterwards.
//!
//! # Example
//!
//! ```
//! use structex_core::field::{FieldSpec, FieldType};
//!
//! let path = FieldSpec::str("path").title("The filesystem mount point");
//! let label = FieldSpec::str("label").default("missing");
//!
//! assert!(path.is_required());
//! assert!(!label.is_required());
//! assert_eq!(label.field_type(), FieldType::Str);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// The primitive type of a content field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string.
    Str,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// Any JSON value, accepted as is.
    Any,
}

impl FieldType {
    /// Returns the short name used in messages and rendered docs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Any => "any",
        }
    }

    /// Returns the JSON Schema `type` keyword for this field type.
    #[must_use]
    pub const fn json_schema_type(&self) -> Option<&'static str> {
        match self {
            Self::Str => Some("string"),
            Self::Int => Some("integer"),
            Self::Float => Some("number"),
            Self::Bool => Some("boolean"),
            Self::Any => None,
        }
    }

    /// Checks `value` against this type, coercing where the conversion is
    /// lossless and unambiguous.
    ///
    /// Returns `None` if the value is not admissible.
    #[must_use]
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (Self::Any, v) => Some(v),

            (Self::Str, v @ Value::String(_)) => Some(v),
            (Self::Str, Value::Number(n)) => Some(Value::String(n.to_string())),

            (Self::Int, Value::Number(n)) => int_from_number(&n).map(Value::from),
            (Self::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (Self::Float, Value::Number(n)) => n.as_f64().and_then(float_value),
            (Self::Float, Value::String(s)) => {
                s.trim().parse::<f64>().ok().and_then(float_value)
            }

            (Self::Bool, v @ Value::Bool(_)) => Some(v),
            (Self::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            (Self::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },

            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn int_from_number(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    // 2^63 is the first float past `i64::MAX`; `as` would saturate it.
    const I64_END: f64 = 9_223_372_036_854_775_808.0;
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= -I64_END && f < I64_END {
        Some(f as i64)
    } else {
        None
    }
}

fn float_value(f: f64) -> Option<Value> {
    Number::from_f64(f).map(Value::Number)
}

/// A named, typed, documented content field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    ty: FieldType,
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default)]
    nullable: bool,
}

impl FieldSpec {
    /// Creates a required field of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
            title: None,
            nullable: false,
        }
    }

    /// Creates a required string field.
    #[must_use]
    pub fn str(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Str)
    }

    /// Creates a required integer field.
    #[must_use]
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// Creates a required float field.
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Creates a required boolean field.
    #[must_use]
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// Creates a required field that accepts any JSON value.
    #[must_use]
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Any)
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets a default value, which makes the field optional.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            self.nullable = true;
        }
        self.default = Some(value);
        self.required = false;
        self
    }

    /// Makes the field optional with a `null` default.
    #[must_use]
    pub fn optional(self) -> Self {
        self.default(Value::Null)
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// Returns whether a value must be supplied at construction.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the human-readable description, if any.
    #[must_use]
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns whether `null` is an admissible value.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable || self.ty == FieldType::Any
    }

    /// Validates and coerces a supplied value for this field.
    pub(crate) fn accept(&self, value: Value) -> Option<Value> {
        if value.is_null() {
            return self.is_nullable().then_some(Value::Null);
        }
        self.ty.coerce(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_coercion() {
        assert_eq!(FieldType::Int.coerce(json!(3)), Some(json!(3)));
        assert_eq!(FieldType::Int.coerce(json!("3")), Some(json!(3)));
        assert_eq!(FieldType::Int.coerce(json!(" 42 ")), Some(json!(42)));
        assert_eq!(FieldType::Int.coerce(json!(4.0)), Some(json!(4)));
        assert_eq!(FieldType::Int.coerce(json!(4.5)), None);
        assert_eq!(FieldType::Int.coerce(json!("three")), None);
        assert_eq!(FieldType::Int.coerce(json!(true)), None);
    }

    #[test]
    fn test_int_coercion_never_saturates() {
        assert_eq!(FieldType::Int.coerce(json!(9_223_372_036_854_775_808.0)), None);
        assert_eq!(FieldType::Int.coerce(json!(u64::MAX)), None);
        assert_eq!(
            FieldType::Int.coerce(json!(-9_223_372_036_854_775_808.0)),
            Some(json!(i64::MIN))
        );
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(FieldType::Float.coerce(json!(1)), Some(json!(1.0)));
        assert_eq!(FieldType::Float.coerce(json!("2.5")), Some(json!(2.5)));
        assert_eq!(FieldType::Float.coerce(json!("nan-ish")), None);
    }

    #[test]
    fn test_str_and_bool_coercion() {
        assert_eq!(FieldType::Str.coerce(json!("x")), Some(json!("x")));
        assert_eq!(FieldType::Str.coerce(json!(12)), Some(json!("12")));
        assert_eq!(FieldType::Str.coerce(json!([1])), None);

        assert_eq!(FieldType::Bool.coerce(json!("yes")), Some(json!(true)));
        assert_eq!(FieldType::Bool.coerce(json!(0)), Some(json!(false)));
        assert_eq!(FieldType::Bool.coerce(json!(2)), None);
    }

    #[test]
    fn test_default_makes_field_optional() {
        let spec = FieldSpec::str("label").default("missing");
        assert!(!spec.is_required());
        assert_eq!(spec.default_value(), Some(&json!("missing")));
        assert!(!spec.is_nullable());
    }

    #[test]
    fn test_optional_accepts_null() {
        let spec = FieldSpec::int("retry").optional();
        assert!(spec.is_nullable());
        assert_eq!(spec.accept(Value::Null), Some(Value::Null));

        let required = FieldSpec::int("count");
        assert_eq!(required.accept(Value::Null), None);
    }
}
