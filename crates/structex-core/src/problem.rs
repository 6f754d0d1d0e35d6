//! Problem instances and the RFC 7807 wire format.
//!
//! A [`Problem`] is the propagatable half of a structured exception: it
//! implements [`std::error::Error`] and travels through `Result::Err`. The
//! data half is the immutable, validated [`Content`] it carries. The two are
//! bound only here.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "type": "<typename>",
//!   "title": "<short description>",
//!   "status": 400,
//!   "detail": "<rendered detail>",
//!   "instance": "<typename>?<urlencoded content>",
//!   "content": { "<field>": "<value>" }
//! }
//! ```
//!
//! Only `type` and `content` are read back; the rest is informational.

use crate::json;
use crate::kind::ProblemType;
use crate::registry;
use crate::roots::{BUG, ERROR, VALIDATION_BUG};
use crate::schema::{Content, ValidationError};
use crate::template::{self, display_value};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The open carrier for anything a contracted callable may return as its
/// error.
pub type Exception = Box<dyn StdError + Send + Sync + 'static>;

/// The serialized form of a [`Problem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// The typename.
    pub r#type: String,
    /// Short description of the problem type.
    pub title: String,
    /// HTTP-like status code.
    pub status: u16,
    /// Rendered detail text.
    pub detail: String,
    /// `<typename>?<urlencoded content>`.
    pub instance: String,
    /// Content fields, in schema order.
    pub content: IndexMap<String, Value>,
}

/// Reading a content field failed.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// The problem has no such field.
    #[error("'{problem}' has no field '{field}'")]
    NoSuchField {
        /// Name of the problem type.
        problem: String,
        /// The requested field.
        field: String,
    },

    /// The field exists but does not convert to the requested type.
    #[error("field '{field}' of '{problem}' cannot be converted: {source}")]
    Conversion {
        /// Name of the problem type.
        problem: String,
        /// The requested field.
        field: String,
        /// The conversion failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Decoding a problem from its wire form failed.
#[derive(Debug, Error)]
pub enum WireError {
    /// The text is not JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is not an object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// A required key is absent.
    #[error("missing key '{0}'")]
    MissingKey(&'static str),

    /// A key holds the wrong kind of JSON value.
    #[error("key '{0}' has the wrong type")]
    InvalidKey(&'static str),

    /// No type with this typename descends from the root being decoded.
    #[error("No {root} type {typename}")]
    UnknownType {
        /// Name of the type decoding was invoked on.
        root: String,
        /// The typename read from the input.
        typename: String,
    },

    /// The type was found but its content did not validate.
    #[error(transparent)]
    Invalid(Box<Problem>),
}

/// A raised structured problem.
#[derive(Clone)]
pub struct Problem {
    kind: Arc<ProblemType>,
    content: Content,
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl Problem {
    pub(crate) fn trusted(kind: &Arc<ProblemType>, values: IndexMap<String, Value>) -> Self {
        Self {
            content: Content::trusted(kind.schema(), values),
            kind: Arc::clone(kind),
            source: None,
        }
    }

    /// Attaches the error that caused this problem.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Exception>) -> Self {
        self.source = Some(Arc::from(source.into()));
        self
    }

    /// Returns the problem type.
    #[must_use]
    pub fn kind(&self) -> &Arc<ProblemType> {
        &self.kind
    }

    /// Returns the validated content.
    #[must_use]
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Returns the attached cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Returns the typename.
    #[must_use]
    pub fn typename(&self) -> &str {
        self.kind.typename()
    }

    /// Returns the type title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.kind.title()
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    /// Returns `true` if this problem's type is `kind` or a subtype of it.
    #[must_use]
    pub fn is_a(&self, kind: &ProblemType) -> bool {
        self.kind.is_subtype_of(kind)
    }

    /// Returns `true` for recoverable problems.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_a(&ERROR)
    }

    /// Returns `true` for defects.
    #[must_use]
    pub fn is_bug(&self) -> bool {
        self.is_a(&BUG)
    }

    /// Reads a content field.
    pub fn get(&self, field: &str) -> Result<&Value, AttributeError> {
        self.content
            .get(field)
            .ok_or_else(|| AttributeError::NoSuchField {
                problem: self.kind.name().to_string(),
                field: field.to_string(),
            })
    }

    /// Reads a content field and converts it.
    pub fn get_as<T: DeserializeOwned>(&self, field: &str) -> Result<T, AttributeError> {
        let value = self.get(field)?.clone();
        serde_json::from_value(value).map_err(|source| AttributeError::Conversion {
            problem: self.kind.name().to_string(),
            field: field.to_string(),
            source,
        })
    }

    /// Converts the whole content into a typed record.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.content.to_value())
    }

    /// Renders the detail text.
    ///
    /// Never fails: a template that cannot be rendered yields
    /// `"<Name>.detail -> <reason>"`, and a type with no detail template
    /// renders its title.
    #[must_use]
    pub fn render(&self) -> String {
        let Some(detail) = self.kind.detail() else {
            return self.kind.title().to_string();
        };
        match template::render(detail, |name| self.content.get(name)) {
            Ok(text) => text,
            Err(err) => format!("{}.detail -> {}", self.kind.name(), err),
        }
    }

    /// Returns `<typename>?<urlencoded content>`.
    #[must_use]
    pub fn instance(&self) -> String {
        let pairs: Vec<(&str, String)> = self
            .content
            .iter()
            .map(|(name, value)| (name, display_value(value)))
            .collect();
        let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
        format!("{}?{}", self.kind.typename(), query)
    }

    /// Returns the wire form.
    #[must_use]
    pub fn to_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.kind.typename().to_string(),
            title: self.kind.title().to_string(),
            status: self.kind.status(),
            detail: self.render(),
            instance: self.instance(),
            content: self.content.to_mapping(),
        }
    }

    /// Returns the wire form as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.kind.typename(),
            "title": self.kind.title(),
            "status": self.kind.status(),
            "detail": self.render(),
            "instance": self.instance(),
            "content": self.content.to_value(),
        })
    }

    /// Returns the wire form as deterministic JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        json::dumps_value(&self.to_value())
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Problem");
        debug
            .field("type", &self.kind.typename())
            .field("content", &self.content.to_mapping());
        if let Some(source) = &self.source {
            debug.field("source", &source.to_string());
        }
        debug.finish()
    }
}

impl PartialEq for Problem {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.kind, &other.kind) && self.content == other.content
    }
}

impl StdError for Problem {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

impl From<ProblemDetails> for Value {
    fn from(details: ProblemDetails) -> Self {
        serde_json::json!({
            "type": details.r#type,
            "title": details.title,
            "status": details.status,
            "detail": details.detail,
            "instance": details.instance,
            "content": details.content,
        })
    }
}

fn validation_bug(kind: &ProblemType, err: ValidationError) -> Problem {
    let mut values = IndexMap::new();
    values.insert("problem".to_string(), Value::from(kind.typename()));
    values.insert("errors".to_string(), Value::from(err.to_string()));
    tracing::debug!(problem = %kind.typename(), error = %err, "problem content rejected");
    Problem::trusted(&VALIDATION_BUG, values).with_source(err)
}

impl ProblemType {
    /// Creates a problem of this type from named field values.
    ///
    /// Invalid content is a defect: the error is a `VALIDATION_BUG` problem
    /// whose source is the [`ValidationError`].
    pub fn instantiate<I, K>(self: &Arc<Self>, fields: I) -> Result<Problem, Problem>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let map: Map<String, Value> = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.instantiate_map(map)
    }

    /// Creates a problem of this type from a JSON object.
    pub fn instantiate_map(self: &Arc<Self>, fields: Map<String, Value>) -> Result<Problem, Problem> {
        match self.schema().validate(fields) {
            Ok(content) => Ok(Problem {
                kind: Arc::clone(self),
                content,
                source: None,
            }),
            Err(err) => Err(validation_bug(self, err)),
        }
    }

    /// Creates a problem of this type from any JSON value.
    pub fn instantiate_value(self: &Arc<Self>, fields: Value) -> Result<Problem, Problem> {
        match self.schema().validate_value(fields) {
            Ok(content) => Ok(Problem {
                kind: Arc::clone(self),
                content,
                source: None,
            }),
            Err(err) => Err(validation_bug(self, err)),
        }
    }

    /// Reconstructs a problem from its wire form, dispatching on `type`.
    ///
    /// The typename must belong to this type or one of its registered
    /// subtypes. A missing `content` is read as an empty object.
    pub fn from_obj(&self, data: &Value) -> Result<Problem, WireError> {
        let obj = data.as_object().ok_or(WireError::NotAnObject)?;
        let typename = obj
            .get("type")
            .ok_or(WireError::MissingKey("type"))?
            .as_str()
            .ok_or(WireError::InvalidKey("type"))?;

        let kind = registry::registry()
            .resolve(self, typename)
            .ok_or_else(|| WireError::UnknownType {
                root: self.name().to_string(),
                typename: typename.to_string(),
            })?;

        let content = match obj.get("content") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(content)) => content.clone(),
            Some(_) => return Err(WireError::InvalidKey("content")),
        };
        kind.instantiate_map(content)
            .map_err(|bug| WireError::Invalid(Box::new(bug)))
    }

    /// Parses JSON text and reconstructs a problem with [`from_obj`](Self::from_obj).
    pub fn from_json(&self, text: &str) -> Result<Problem, WireError> {
        let obj = json::loads(text)?;
        self.from_obj(&Value::Object(obj))
    }

    /// Parses a JSON object of field values and instantiates this exact type.
    pub fn parse_json(self: &Arc<Self>, text: &str) -> Result<Problem, WireError> {
        let fields = json::loads(text)?;
        self.instantiate_map(fields)
            .map_err(|bug| WireError::Invalid(Box::new(bug)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DEFAULTED_ERROR, EXAMPLE_ERROR, INSUFFICIENT_SPACE, OP_ERROR};
    use crate::field::FieldSpec;
    use serde_json::json;

    fn example(name: &str, code: i64) -> Problem {
        EXAMPLE_ERROR
            .instantiate([("name", json!(name)), ("code", json!(code))])
            .unwrap()
    }

    #[test]
    fn test_detail_rendering() {
        assert_eq!(example("x", 1).to_string(), "Example error: name=x code=1");
    }

    #[test]
    fn test_default_is_applied() {
        let problem = DEFAULTED_ERROR.instantiate(Vec::<(&str, Value)>::new()).unwrap();
        assert_eq!(problem.get("label").unwrap(), "missing");
    }

    #[test]
    fn test_unknown_field_read() {
        let err = example("x", 1).get("nope").unwrap_err();
        assert!(matches!(err, AttributeError::NoSuchField { .. }));
        assert_eq!(err.to_string(), "'ExampleError' has no field 'nope'");
    }

    #[test]
    fn test_typed_reads() {
        let problem = example("x", 7);
        assert_eq!(problem.get_as::<i64>("code").unwrap(), 7);
        assert!(matches!(
            problem.get_as::<bool>("name"),
            Err(AttributeError::Conversion { .. })
        ));

        #[derive(Deserialize)]
        struct Example {
            name: String,
            code: i64,
        }
        let typed: Example = problem.content_as().unwrap();
        assert_eq!((typed.name.as_str(), typed.code), ("x", 7));
    }

    #[test]
    fn test_invalid_content_is_a_validation_bug() {
        let bug = EXAMPLE_ERROR
            .instantiate([("name", json!("x"))])
            .unwrap_err();
        assert!(bug.is_a(&VALIDATION_BUG));
        assert!(bug.is_bug());
        assert_eq!(
            bug.get("problem").unwrap(),
            &json!(EXAMPLE_ERROR.typename())
        );
        let source = bug.source().unwrap();
        assert!(source.is::<ValidationError>());
    }

    #[test]
    fn test_to_details_shape() {
        let details = example("x y", 1).to_details();
        assert_eq!(details.r#type, EXAMPLE_ERROR.typename());
        assert_eq!(details.status, 400);
        assert_eq!(details.detail, "Example error: name=x y code=1");
        assert_eq!(
            details.instance,
            format!("{}?name=x+y&code=1", EXAMPLE_ERROR.typename())
        );
        assert_eq!(
            serde_json::to_value(&details.content).unwrap(),
            json!({"name": "x y", "code": 1})
        );
        assert_eq!(
            details.content.keys().collect::<Vec<_>>(),
            ["name", "code"]
        );

        let value = serde_json::to_value(&details).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 6);
        assert_eq!(Value::from(details), example("x y", 1).to_value());
    }

    #[test]
    fn test_to_value_keeps_schema_order() {
        let full = INSUFFICIENT_SPACE
            .instantiate([("need", json!(300)), ("path", json!("/tmp")), ("avail", json!(100))])
            .unwrap();
        let value = full.to_value();
        let keys: Vec<&String> = value["content"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["path", "avail", "need"]);
    }

    #[test]
    fn test_equality_is_type_and_content() {
        assert_eq!(example("x", 1), example("x", 1));
        assert_ne!(example("x", 1), example("x", 2));
    }

    #[test]
    fn test_formatted_detail() {
        let low = ProblemType::builder("LowSpace")
            .base(&ERROR)
            .detail("Only {avail:,} bytes free ({ratio:.0%}), code {code:03}")
            .field(FieldSpec::int("avail"))
            .field(FieldSpec::float("ratio"))
            .field(FieldSpec::int("code"))
            .build();
        let problem = low
            .instantiate([("avail", json!(1_048_576)), ("ratio", json!(0.05)), ("code", json!(7))])
            .unwrap();
        assert_eq!(problem.to_string(), "Only 1,048,576 bytes free (5%), code 007");
    }

    #[test]
    fn test_render_fallbacks() {
        let broken = ProblemType::builder("BrokenDetail")
            .base(&ERROR)
            .detail("Needs {absent}")
            .field(FieldSpec::str("present"))
            .build();
        let problem = broken.instantiate([("present", json!("p"))]).unwrap();
        assert_eq!(
            problem.to_string(),
            "BrokenDetail.detail -> missing field 'absent'"
        );

        let plain = ProblemType::builder("NoDetail").doc("Just a title.").build();
        let problem = plain.instantiate(Vec::<(&str, Value)>::new()).unwrap();
        assert_eq!(problem.to_string(), "Just a title.");
    }

    #[test]
    fn test_round_trip_through_root() {
        let original = OP_ERROR
            .instantiate([
                ("op", json!("div")),
                ("a", json!(1.5)),
                ("b", json!(0.0)),
                ("error", json!("division by zero")),
            ])
            .unwrap();
        let decoded = ERROR.from_obj(&original.to_value()).unwrap();
        assert_eq!(decoded, original);

        let decoded = ERROR.from_json(&original.to_json()).unwrap();
        assert_eq!(decoded, original);

        let decoded = OP_ERROR.from_obj(&original.to_value()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_unknown_typename() {
        let err = ERROR.from_json(r#"{"type": "NoSuchError"}"#).unwrap_err();
        assert_eq!(err.to_string(), "No Error type NoSuchError");
        assert!(matches!(err, WireError::UnknownType { .. }));
    }

    #[test]
    fn test_bug_types_are_not_errors() {
        let bug = Problem::trusted(&BUG, IndexMap::new());
        let err = ERROR.from_obj(&bug.to_value()).unwrap_err();
        assert_eq!(err.to_string(), "No Error type structex.Bug");
    }

    #[test]
    fn test_parse_json_targets_exact_type() {
        let problem = EXAMPLE_ERROR
            .parse_json(r#"{"name": "x", "code": "3"}"#)
            .unwrap();
        assert_eq!(problem.get("code").unwrap(), &json!(3));

        let err = EXAMPLE_ERROR.parse_json(r#"{"name": "x"}"#).unwrap_err();
        let WireError::Invalid(bug) = err else {
            panic!("expected invalid content, got {err:?}");
        };
        assert!(bug.is_a(&VALIDATION_BUG));
    }
}
