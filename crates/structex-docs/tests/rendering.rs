//! End-to-end rendering of declared problem types and contracts.

use std::io::Write;

use structex_core::roots::ERROR;
use structex_core::{declare_problem, Allow, Raises};
use structex_docs::{content_schema, extend_doc, render_problem_type, render_raises, DocsConfig};

declare_problem! {
    /// A storage backend refused the request.
    ///
    /// Carries the backend's own reason.
    pub static STORAGE_ERROR: StorageError(ERROR) {
        status = 502;
        detail = "Storage backend {backend} failed: {reason}";
        backend: Str => "Backend name";
        reason: Str => "Reason given by the backend";
    }

    /// The backend is read-only.
    pub static READ_ONLY: ReadOnly(STORAGE_ERROR) {
        retry: Bool = false => "Whether retrying may help";
    }
}

#[test]
fn test_contract_section_on_indented_doc() {
    let raises = Raises::new([
        Allow::from(&STORAGE_ERROR),
        Allow::native::<std::io::Error>(),
    ]);
    let section = render_raises(&raises, &DocsConfig::default());
    let doc = extend_doc("Writes a blob.\n    ", &section);

    assert_eq!(
        doc,
        "Writes a blob.\n\n    \
         # Raises\n\n    \
         - `rendering.StorageError` (or a subclass of it)\n    \
         \x20 A storage backend refused the request.\n    \
         - `std.io.error.Error`\n    \
         \x20 (not documented)\n"
    );
}

#[test]
fn test_configured_section() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "heading = \"Errors:\"").unwrap();
    writeln!(file, "subclass_note = \"(or a subtype)\"").unwrap();
    writeln!(file, "title_indent = 0").unwrap();

    let config = DocsConfig::load_from(file.path(), "STRUCTEX_DOCS_RENDERING_TEST").unwrap();
    let section = render_raises(&Raises::new([Allow::from(&STORAGE_ERROR)]), &config);
    assert_eq!(
        section,
        "Errors:\n\n- `rendering.StorageError` (or a subtype)\nA storage backend refused the request.\n"
    );
}

#[test]
fn test_inherited_reference() {
    let page = render_problem_type(&READ_ONLY);
    assert!(page.contains("- **Status:** 502\n"));
    assert!(page.contains("- **Detail:** `Storage backend {backend} failed: {reason}`\n"));
    assert!(page.contains("- **Extends:** `rendering.StorageError`\n"));
    assert!(page.contains("| `backend` | str | yes | Backend name |\n"));
    assert!(page.contains("| `retry` | bool | no (default `false`) | Whether retrying may help |\n"));

    let page = render_problem_type(&STORAGE_ERROR);
    assert!(page.contains("Carries the backend's own reason.\n\n"));
    assert!(page.contains("- **Subtypes:** `rendering.ReadOnly`\n"));
}

#[test]
fn test_inherited_schema() {
    let schema = content_schema(&READ_ONLY);
    let properties = schema["properties"].as_object().unwrap();
    let names: Vec<&str> = properties.keys().map(String::as_str).collect();
    assert_eq!(names, ["backend", "reason", "retry"]);
    assert_eq!(schema["required"], serde_json::json!(["backend", "reason"]));
}
