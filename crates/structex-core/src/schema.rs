//! Content schemas: validated records of named, typed fields.
//!
//! A [`ContentSchema`] is the data half of a problem type. It knows nothing
//! about errors or propagation; it only validates raw mappings into
//! immutable [`Content`] values and composes with parent schemas.
//!
//! # Composition
//!
//! A schema's fields are the union of its parents' fields, in the order the
//! parents are listed, followed by its own fields. Later parents override
//! earlier ones and own fields override everything; an overridden field
//! keeps the position where it first appeared. When two parents supply the
//! same field with different types the override still applies, but the
//! clash is recorded as a [`FieldConflict`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use structex_core::field::FieldSpec;
//! use structex_core::schema::ContentSchema;
//! use serde_json::json;
//!
//! let schema = Arc::new(ContentSchema::compose(
//!     "InsufficientSpace",
//!     &[],
//!     vec![FieldSpec::str("path"), FieldSpec::int("avail"), FieldSpec::int("need")],
//! ));
//!
//! let content = schema
//!     .validate_value(json!({"path": "/tmp", "avail": "100", "need": 300}))
//!     .unwrap();
//! assert_eq!(content.get("avail"), Some(&json!(100)));
//! ```

use crate::field::{FieldSpec, FieldType};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A single problem found while validating content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldIssue {
    /// The mapping contains a key the schema does not declare.
    #[error("{field}: unknown field")]
    Unknown {
        /// Offending key.
        field: String,
    },

    /// A required field is absent and has no default.
    #[error("{field}: field required")]
    Missing {
        /// Missing field name.
        field: String,
    },

    /// The supplied value does not satisfy the field type.
    #[error("{field}: expected {expected}, got {found}")]
    Type {
        /// Field name.
        field: String,
        /// Declared type.
        expected: FieldType,
        /// Short rendering of the rejected value.
        found: String,
    },
}

impl FieldIssue {
    /// Returns the name of the field this issue refers to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Unknown { field } | Self::Missing { field } | Self::Type { field, .. } => field,
        }
    }
}

/// Content failed validation against its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} validation error(s) for {schema}: {}", .issues.len(), render_issues(.issues))]
pub struct ValidationError {
    /// Name of the schema that rejected the content.
    pub schema: String,
    /// Every issue found, in field order.
    pub issues: Vec<FieldIssue>,
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Two parents supplied the same field with different types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldConflict {
    /// Field name.
    pub field: String,
    /// Type supplied by the earlier parent.
    pub previous: FieldType,
    /// Type supplied by the later parent, which wins.
    pub replacement: FieldType,
}

/// A named set of field descriptors with an associated validator.
#[derive(Debug, Clone)]
pub struct ContentSchema {
    name: String,
    fields: IndexMap<String, FieldSpec>,
    parents: Vec<Arc<ContentSchema>>,
    conflicts: Vec<FieldConflict>,
}

impl ContentSchema {
    /// Builds a schema from parent schemas and the schema's own fields.
    ///
    /// See the [module documentation](self) for the merge rules.
    #[must_use]
    pub fn compose(
        name: impl Into<String>,
        parents: &[Arc<ContentSchema>],
        own: Vec<FieldSpec>,
    ) -> Self {
        let name = name.into();
        let mut fields: IndexMap<String, FieldSpec> = IndexMap::new();
        let mut conflicts = Vec::new();

        for parent in parents {
            for (field_name, spec) in &parent.fields {
                if let Some(previous) = fields.get(field_name) {
                    if previous.field_type() != spec.field_type() {
                        tracing::warn!(
                            schema = %name,
                            field = %field_name,
                            previous = %previous.field_type(),
                            replacement = %spec.field_type(),
                            "conflicting field types inherited; last listed parent wins"
                        );
                        conflicts.push(FieldConflict {
                            field: field_name.clone(),
                            previous: previous.field_type(),
                            replacement: spec.field_type(),
                        });
                    }
                }
                fields.insert(field_name.clone(), spec.clone());
            }
        }

        for spec in own {
            fields.insert(spec.name().to_string(), spec);
        }

        Self {
            name,
            fields,
            parents: parents.to_vec(),
            conflicts,
        }
    }

    /// Returns the schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all fields in display order.
    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, FieldSpec> {
        &self.fields
    }

    /// Looks up one field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Returns the schemas this one was composed from.
    #[must_use]
    pub fn parents(&self) -> &[Arc<ContentSchema>] {
        &self.parents
    }

    /// Returns the inherited type clashes recorded during composition.
    #[must_use]
    pub fn conflicts(&self) -> &[FieldConflict] {
        &self.conflicts
    }

    /// Returns `true` if the schema declares no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Validates a raw mapping into content.
    ///
    /// Every issue is collected before failing, so the error describes the
    /// whole mapping rather than the first bad field.
    pub fn validate(self: &Arc<Self>, mut raw: Map<String, Value>) -> Result<Content, ValidationError> {
        let mut values = IndexMap::with_capacity(self.fields.len());
        let mut issues = Vec::new();

        for (name, spec) in &self.fields {
            match raw.remove(name) {
                Some(value) => {
                    let found = describe(&value);
                    match spec.accept(value) {
                        Some(accepted) => {
                            values.insert(name.clone(), accepted);
                        }
                        None => issues.push(FieldIssue::Type {
                            field: name.clone(),
                            expected: spec.field_type(),
                            found,
                        }),
                    }
                }
                None => match spec.default_value() {
                    Some(default) => {
                        values.insert(name.clone(), default.clone());
                    }
                    None => issues.push(FieldIssue::Missing {
                        field: name.clone(),
                    }),
                },
            }
        }

        let mut unknown: Vec<String> = raw.into_iter().map(|(k, _)| k).collect();
        unknown.sort();
        issues.extend(unknown.into_iter().map(|field| FieldIssue::Unknown { field }));

        if issues.is_empty() {
            Ok(Content {
                schema: Arc::clone(self),
                values,
            })
        } else {
            Err(ValidationError {
                schema: self.name.clone(),
                issues,
            })
        }
    }

    /// Validates a JSON value, which must be an object.
    pub fn validate_value(self: &Arc<Self>, raw: Value) -> Result<Content, ValidationError> {
        match raw {
            Value::Object(map) => self.validate(map),
            other => Err(ValidationError {
                schema: self.name.clone(),
                issues: vec![FieldIssue::Type {
                    field: "__root__".to_string(),
                    expected: FieldType::Any,
                    found: describe(&other),
                }],
            }),
        }
    }
}

fn describe(value: &Value) -> String {
    const MAX: usize = 40;
    let rendered = value.to_string();
    if rendered.chars().count() > MAX {
        let cut: String = rendered.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        rendered
    }
}

/// An immutable, fully populated record validated against a schema.
#[derive(Debug, Clone)]
pub struct Content {
    schema: Arc<ContentSchema>,
    values: IndexMap<String, Value>,
}

impl Content {
    /// Creates content that is already known to satisfy `schema`.
    pub(crate) fn trusted(schema: &Arc<ContentSchema>, values: IndexMap<String, Value>) -> Self {
        debug_assert!(values.keys().all(|k| schema.fields.contains_key(k)));
        Self {
            schema: Arc::clone(schema),
            values,
        }
    }

    /// Returns the schema this content was validated against.
    #[must_use]
    pub fn schema(&self) -> &Arc<ContentSchema> {
        &self.schema
    }

    /// Reads one field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterates over fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a plain mapping, in schema order, suitable for the wire.
    #[must_use]
    pub fn to_mapping(&self) -> IndexMap<String, Value> {
        self.values.clone()
    }

    /// Returns the content as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value().to_string())
    }
}
