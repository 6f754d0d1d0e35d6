//! Integration tests for `declare_problem!` declarations.

use serde_json::json;
use std::sync::Arc;
use structex_core::fixtures::{FOO_ERROR, PLEASE_WAIT};
use structex_core::roots::{BUG, ERROR};
use structex_core::{declare_problem, problem, registry, FieldType, WireError};

declare_problem! {
    /// Raised when a quota is exceeded.
    ///
    /// Carries the limit that was hit.
    pub static QUOTA_EXCEEDED: QuotaExceeded(ERROR) {
        status = 429;
        detail = "Quota {limit} exceeded";
        limit: Int => "The quota";
    }

    /// Tagged problems carry a tag.
    pub static TAGGED: Tagged(ERROR) {
        tag: Str = "none" => "A tag";
    }

    /// Both a quota problem and a tagged one.
    pub static TAGGED_QUOTA: TaggedQuota(QUOTA_EXCEEDED, TAGGED) {
        retry: Bool = false;
    }

    /// The same pair with the quota listed last.
    pub static QUOTA_TAGGED: QuotaTagged(TAGGED, QUOTA_EXCEEDED) {}

    /// Declares reserved names the way a field would be declared.
    pub static ROUTED: Routed(ERROR) {
        detail: Str = "Routed {x}";
        status: Int = 409;
        _private: Str = "kept aside";
        x: Any;
    }

    /// Never touched before the registry is asked for it.
    pub static UNTOUCHED: Untouched(ERROR) {
        typename = "tests.Untouched";
    }
}

#[test]
fn test_metadata_from_declaration() {
    assert_eq!(QUOTA_EXCEEDED.title(), "Raised when a quota is exceeded.");
    assert_eq!(
        QUOTA_EXCEEDED.doc(),
        Some("Raised when a quota is exceeded.\n\nCarries the limit that was hit.")
    );
    assert_eq!(QUOTA_EXCEEDED.typename(), "declarations.QuotaExceeded");
    assert_eq!(QUOTA_EXCEEDED.status(), 429);
}

#[test]
fn test_multiple_bases_compose_in_order() {
    let schema = TAGGED_QUOTA.schema();
    let names: Vec<&String> = schema.fields().keys().collect();
    assert_eq!(names, ["limit", "tag", "retry"]);

    let parents = schema.parents();
    assert!(Arc::ptr_eq(&parents[0], QUOTA_EXCEEDED.schema()));
    assert!(Arc::ptr_eq(&parents[1], TAGGED.schema()));

    assert_eq!(TAGGED_QUOTA.status(), 429);
    assert_eq!(TAGGED_QUOTA.detail(), Some("Quota {limit} exceeded"));
    assert!(TAGGED_QUOTA.is_subtype_of(&TAGGED));
    assert!(TAGGED_QUOTA.is_subtype_of(&ERROR));

    let problem = problem!(TAGGED_QUOTA, limit = 5).unwrap();
    assert_eq!(problem.get("tag").unwrap(), "none");
    assert_eq!(problem.get("retry").unwrap(), &json!(false));
    assert_eq!(problem.to_string(), "Quota 5 exceeded");
}

#[test]
fn test_metadata_from_a_later_base() {
    assert_eq!(QUOTA_TAGGED.status(), 429);
    assert_eq!(QUOTA_TAGGED.detail(), Some("Quota {limit} exceeded"));

    let names: Vec<&str> = QUOTA_TAGGED.ancestors().iter().map(|a| a.name()).collect();
    assert_eq!(names, ["Tagged", "QuotaExceeded", "Error"]);

    let fields: Vec<&String> = QUOTA_TAGGED.schema().fields().keys().collect();
    assert_eq!(fields, ["tag", "limit"]);
}

#[test]
fn test_reserved_names_route_to_metadata() {
    assert_eq!(ROUTED.detail(), Some("Routed {x}"));
    assert_eq!(ROUTED.status(), 409);
    assert_eq!(ROUTED.attribute("_private"), Some(&json!("kept aside")));

    let names: Vec<&String> = ROUTED.schema().fields().keys().collect();
    assert_eq!(names, ["x"]);
    assert_eq!(
        ROUTED.schema().field("x").map(|f| f.field_type()),
        Some(FieldType::Any)
    );

    let problem = problem!(ROUTED, x = json!({"nested": [1, 2]})).unwrap();
    assert_eq!(problem.to_string(), r#"Routed {"nested":[1,2]}"#);
}

#[test]
fn test_declarations_are_registered_up_front() {
    let found = registry().lookup("tests.Untouched");
    assert!(found.is_some());

    let decoded = ERROR
        .from_json(r#"{"type": "tests.Untouched", "content": {}}"#)
        .unwrap();
    assert_eq!(decoded.typename(), "tests.Untouched");
}

#[test]
fn test_decoding_is_scoped_to_the_root() {
    let wait = problem!(PLEASE_WAIT, howlong = 3).unwrap();

    assert_eq!(FOO_ERROR.from_obj(&wait.to_value()).unwrap(), wait);

    let err = QUOTA_EXCEEDED.from_obj(&wait.to_value()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("No QuotaExceeded type {}", PLEASE_WAIT.typename())
    );

    let err = BUG.from_obj(&wait.to_value()).unwrap_err();
    assert!(matches!(err, WireError::UnknownType { .. }));
}

#[test]
fn test_decoding_rejects_bad_content() {
    let err = ERROR
        .from_json(r#"{"type": "declarations.QuotaExceeded", "content": {"limit": "lots"}}"#)
        .unwrap_err();
    let WireError::Invalid(bug) = err else {
        panic!("expected invalid content, got {err:?}");
    };
    assert!(bug.is_bug());
    assert!(bug.to_string().contains("limit"));
}
