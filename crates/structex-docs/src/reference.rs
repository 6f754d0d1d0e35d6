//! Reference pages and JSON Schemas for problem types.

use serde_json::{json, Map, Value};
use structex_core::{FieldSpec, ProblemType};

/// Builds a JSON Schema (draft 2020-12) for the content of `kind`.
///
/// Fields without a default are `required`; nullable fields accept `null`
/// alongside their type. Field titles become `description`s.
pub fn content_schema(kind: &ProblemType) -> Value {
    let schema = kind.schema();
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, spec) in schema.fields() {
        properties.insert(name.clone(), field_schema(spec));
        if spec.is_required() {
            required.push(Value::String(name.clone()));
        }
    }

    let mut root = json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": schema.name(),
        "type": "object",
        "properties": properties,
        "additionalProperties": false,
    });
    if !kind.title().is_empty() {
        root["description"] = Value::from(kind.title());
    }
    if !required.is_empty() {
        root["required"] = Value::Array(required);
    }
    root
}

fn field_schema(spec: &FieldSpec) -> Value {
    let mut field = Map::new();
    if let Some(ty) = spec.field_type().json_schema_type() {
        let ty = if spec.is_nullable() {
            json!([ty, "null"])
        } else {
            Value::from(ty)
        };
        field.insert("type".to_string(), ty);
    }
    if let Some(title) = spec.title_text() {
        field.insert("description".to_string(), Value::from(title));
    }
    if let Some(default) = spec.default_value() {
        field.insert("default".to_string(), default.clone());
    }
    Value::Object(field)
}

/// Renders a markdown reference page for `kind`.
pub fn render_problem_type(kind: &ProblemType) -> String {
    let mut out = format!("## {}\n\n", kind.name());

    if !kind.title().is_empty() {
        out.push_str(kind.title());
        out.push_str("\n\n");
    }
    if let Some(rest) = kind.doc().and_then(doc_body) {
        out.push_str(&rest);
        out.push_str("\n\n");
    }

    out.push_str(&format!("- **Type:** `{}`\n", kind.typename()));
    out.push_str(&format!("- **Status:** {}\n", kind.status()));
    if let Some(detail) = kind.detail() {
        out.push_str(&format!("- **Detail:** `{detail}`\n"));
    }
    if !kind.bases().is_empty() {
        out.push_str(&format!("- **Extends:** {}\n", code_list(kind.bases())));
    }
    let subtypes = kind.subtypes();
    if !subtypes.is_empty() {
        out.push_str(&format!("- **Subtypes:** {}\n", code_list(&subtypes)));
    }

    let schema = kind.schema();
    if schema.is_empty() {
        out.push_str("\nNo content fields.\n");
    } else {
        out.push_str("\n| Field | Type | Required | Description |\n");
        out.push_str("|-------|------|----------|-------------|\n");
        for spec in schema.fields().values() {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                spec.name(),
                spec.field_type().as_str(),
                required_cell(spec),
                spec.title_text().unwrap_or(""),
            ));
        }
    }

    for conflict in schema.conflicts() {
        out.push_str(&format!(
            "\n> Field `{}` is `{}` in an earlier base and `{}` in a later one; the later wins.\n",
            conflict.field,
            conflict.previous.as_str(),
            conflict.replacement.as_str(),
        ));
    }

    out
}

fn code_list(kinds: &[std::sync::Arc<ProblemType>]) -> String {
    kinds
        .iter()
        .map(|kind| format!("`{}`", kind.typename()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn required_cell(spec: &FieldSpec) -> String {
    match spec.default_value() {
        None => "yes".to_string(),
        Some(default) => format!("no (default `{default}`)"),
    }
}

/// Returns the doc text after its first paragraph, if any.
fn doc_body(doc: &str) -> Option<String> {
    let (_, rest) = doc.trim().split_once("\n\n")?;
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}
