//! Integration tests for the `#[raises]` macro.
//!
//! These tests verify that the generated code enforces the contract,
//! registers it for introspection and honours test substitutions.

use serde_json::json;
use std::collections::HashSet;
use std::io;
use structex::fixtures::{FAILED, FOO_ERROR, OP_ERROR, PLEASE_WAIT};
use structex::prelude::*;
use structex::roots::BAD_EXCEPTION_BUG;
use structex::{contract_of, lookup_contract, substitute};

#[raises(OP_ERROR)]
fn div(a: f64, b: f64) -> Result<f64, Exception> {
    if b == 0.0 {
        return Err(problem!(OP_ERROR, op = "div", a = a, b = b, error = "division by zero")?.into());
    }
    Ok(a / b)
}

/// Always fails with whatever it is given.
#[raises([FOO_ERROR, native(io::Error, "An I/O failure")])]
fn fail_with(error: Exception) -> Result<(), Exception> {
    Err(error)
}

#[raises(None)]
fn infallible(fail: bool) -> Result<u8, Exception> {
    if fail {
        return Err("should not happen".into());
    }
    Ok(1)
}

#[raises(Any, path = "custom::anything")]
fn anything() -> Result<(), Exception> {
    Err(io::Error::other("whatever").into())
}

#[raises(FOO_ERROR)]
fn reads_file(path: &str) -> Result<String, Exception> {
    let text = std::fs::read_to_string(path)?;
    Ok(text)
}

struct Counter {
    value: u32,
}

impl Counter {
    #[raises(FOO_ERROR, path = "raises_integration::Counter::bump")]
    fn bump(&mut self, by: u32) -> Result<u32, Exception> {
        self.value += by;
        Ok(self.value)
    }
}

struct Launcher;
struct Waiter;

// Associated functions without `self` still default to `module::name`.
impl Launcher {
    #[raises(FAILED)]
    fn start() -> Result<(), Exception> {
        Ok(())
    }
}

impl Waiter {
    #[raises(PLEASE_WAIT)]
    fn start() -> Result<(), Exception> {
        Ok(())
    }
}

fn as_problem(error: &Exception) -> &Problem {
    error.downcast_ref::<Problem>().unwrap()
}

#[test]
fn test_success_passes_through() {
    assert_eq!(div(6.0, 3.0).unwrap(), 2.0);
    let mut counter = Counter { value: 1 };
    assert_eq!(counter.bump(2).unwrap(), 3);
}

#[test]
fn test_declared_problem_passes_unchanged() {
    let error = div(1.0, 0.0).unwrap_err();
    let problem = as_problem(&error);
    assert!(problem.is_a(&OP_ERROR));
    assert_eq!(problem.to_string(), "Op div(a=1.0, b=0.0) failed: division by zero");
}

#[test]
fn test_subtype_and_native_pass_unchanged() {
    let wait = problem!(PLEASE_WAIT, howlong = 2).unwrap();
    let error = fail_with(wait.clone().into()).unwrap_err();
    assert_eq!(as_problem(&error), &wait);

    let error = fail_with(io::Error::other("disk").into()).unwrap_err();
    assert!(error.is::<io::Error>());
}

#[test]
fn test_undeclared_error_becomes_bad_exception_bug() {
    let failed = problem!(FAILED, what = "launch").unwrap();
    let error = fail_with(failed.clone().into()).unwrap_err();

    let bug = as_problem(&error);
    assert!(bug.is_a(&BAD_EXCEPTION_BUG));
    assert_eq!(bug.get("raised").unwrap(), &json!("Failed to launch"));
    let cause = bug.cause().unwrap().downcast_ref::<Problem>().unwrap();
    assert_eq!(cause, &failed);
}

#[test]
fn test_question_mark_errors_are_enforced() {
    let error = reads_file("/definitely/not/here.txt").unwrap_err();
    assert!(as_problem(&error).is_a(&BAD_EXCEPTION_BUG));
}

#[test]
fn test_empty_contract_converts_everything() {
    assert_eq!(infallible(false).unwrap(), 1);
    let error = infallible(true).unwrap_err();
    assert!(as_problem(&error).is_a(&BAD_EXCEPTION_BUG));
}

#[test]
fn test_any_contract_allows_everything() {
    let error = anything().unwrap_err();
    assert!(error.is::<io::Error>());
}

#[test]
fn test_contracts_are_registered_by_path() {
    let raises = contract_of("raises_integration::div").unwrap();
    assert_eq!(raises.name(), Some("raises_integration::div"));
    assert_eq!(
        may_raise(Some(raises)),
        HashSet::from([ExceptionClass::from(&OP_ERROR)])
    );

    let classes = may_raise_named("raises_integration::fail_with");
    assert_eq!(classes.len(), 2);
    assert!(classes.contains(&ExceptionClass::native::<io::Error>()));

    assert!(may_raise_named("raises_integration::infallible").is_empty());
    assert!(contract_of("custom::anything").is_some());
    assert_eq!(
        may_raise_named("raises_integration::not_contracted"),
        HashSet::from([ExceptionClass::Any])
    );
}

#[test]
fn test_methods_register_under_their_explicit_path() {
    let raises = contract_of("raises_integration::Counter::bump").unwrap();
    assert_eq!(raises.allowed(), [ExceptionClass::from(&FOO_ERROR)]);
    assert!(contract_of("raises_integration::bump").is_none());
}

#[test]
fn test_shared_paths_are_reported_as_ambiguous() {
    assert!(Launcher::start().is_ok());
    assert!(Waiter::start().is_ok());

    let err = lookup_contract("raises_integration::start").unwrap_err();
    assert_eq!(err.count, 2);
    assert!(err.to_string().contains("'raises_integration::start'"));

    assert!(contract_of("raises_integration::start").is_none());
    assert_eq!(
        may_raise_named("raises_integration::start"),
        HashSet::from([ExceptionClass::Any])
    );
    assert!(lookup_contract("raises_integration::div").unwrap().is_some());
}

#[test]
fn test_substitution_skips_the_body() {
    let scripted = problem!(OP_ERROR, op = "div", a = 1, b = 1, error = "scripted").unwrap();
    let expected = scripted.clone();
    let _guard = substitute::install("raises_integration::div", move || scripted.clone().into());

    let error = div(4.0, 2.0).unwrap_err();
    assert_eq!(as_problem(&error), &expected);
}
