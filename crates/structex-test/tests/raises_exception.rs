//! Integration tests for contract-checked substitution.

use serde_json::json;
use std::io;
use structex::fixtures::{FAILED, FOO_ERROR, INSUFFICIENT_SPACE, PLEASE_WAIT};
use structex::prelude::*;
use structex::roots::{BAD_EXCEPTIONS_IN_TEST_BUG, UNKNOWN_CONTRACT_BUG};
use structex_test::{raises_exception, RaiserExhausted};

#[raises([INSUFFICIENT_SPACE, FOO_ERROR])]
fn reserve(path: &str, need: i64) -> Result<i64, Exception> {
    Ok(need - path.len() as i64)
}

#[raises(native(io::Error))]
fn read_config() -> Result<String, Exception> {
    Ok("config".to_string())
}

struct Primary;
struct Replica;

impl Primary {
    #[raises(FOO_ERROR)]
    fn sync() -> Result<(), Exception> {
        Ok(())
    }
}

impl Replica {
    #[raises(FAILED)]
    fn sync() -> Result<(), Exception> {
        Ok(())
    }
}

fn full_disk() -> Problem {
    problem!(INSUFFICIENT_SPACE, path = "/", avail = 0, need = 10).unwrap()
}

#[test]
fn test_scripted_errors_are_returned_in_order() {
    let wait = problem!(PLEASE_WAIT, howlong = 5).unwrap();
    let _sub = raises_exception(
        "raises_exception::reserve",
        [full_disk(), wait.clone()],
    )
    .unwrap();

    let first = reserve("/", 10).unwrap_err();
    assert_eq!(first.downcast_ref::<Problem>(), Some(&full_disk()));

    let second = reserve("/", 10).unwrap_err();
    assert_eq!(second.downcast_ref::<Problem>(), Some(&wait));

    let third = reserve("/", 10).unwrap_err();
    let exhausted = third.downcast_ref::<RaiserExhausted>().unwrap();
    assert_eq!(exhausted.path, "raises_exception::reserve");
    assert_eq!(exhausted.raised, 2);
}

#[test]
fn test_body_runs_again_after_drop() {
    {
        let _sub = raises_exception("raises_exception::reserve", [full_disk()]).unwrap();
        assert!(reserve("/tmp", 10).is_err());
    }
    assert_eq!(reserve("/tmp", 10).unwrap(), 6);
}

#[test]
fn test_disallowed_script_is_rejected() {
    let failed = problem!(FAILED, what = "launch").unwrap();
    let bug = raises_exception("raises_exception::reserve", [full_disk(), failed]).unwrap_err();

    assert!(bug.is_a(&BAD_EXCEPTIONS_IN_TEST_BUG));
    assert_eq!(bug.get("name").unwrap(), &json!("raises_exception::reserve"));
    assert_eq!(
        bug.get("exceptions").unwrap(),
        &json!("structex_core.fixtures.Failed(Failed to launch)")
    );
    assert!(bug
        .to_string()
        .starts_with("Test case for raises_exception::reserve raises bad exception(s): "));

    // Nothing was installed.
    assert_eq!(reserve("/", 1).unwrap(), 0);
}

#[test]
fn test_native_classes() {
    let _sub = raises_exception(
        "raises_exception::read_config",
        [io::Error::new(io::ErrorKind::NotFound, "missing")],
    )
    .unwrap();
    let error = read_config().unwrap_err();
    assert_eq!(
        error.downcast_ref::<io::Error>().map(io::Error::kind),
        Some(io::ErrorKind::NotFound)
    );

    let bug = raises_exception("raises_exception::read_config", ["not an io error"]).unwrap_err();
    assert_eq!(bug.get("exceptions").unwrap(), &json!("not an io error"));
}

#[test]
fn test_untested_classes_are_reported() {
    let wait = problem!(PLEASE_WAIT, howlong = 1).unwrap();
    let sub = raises_exception("raises_exception::reserve", [wait]).unwrap();

    // PleaseWait is a FooError, so only InsufficientSpace is left untested.
    let untested: Vec<String> = sub.untested().iter().map(ExceptionClass::qualname).collect();
    assert_eq!(untested, [INSUFFICIENT_SPACE.qualname()]);
}

#[test]
fn test_shared_path_is_not_substituted() {
    let failed = problem!(FAILED, what = "sync").unwrap();
    let bug = raises_exception("raises_exception::sync", [failed]).unwrap_err();

    assert!(bug.is_a(&UNKNOWN_CONTRACT_BUG));
    assert!(bug
        .get("reason")
        .unwrap()
        .as_str()
        .unwrap()
        .starts_with("2 contracts are registered under 'raises_exception::sync'"));

    // Nothing was installed for either function.
    assert!(Primary::sync().is_ok());
    assert!(Replica::sync().is_ok());
}

#[test]
fn test_unregistered_path_is_rejected() {
    let bug = raises_exception("raises_exception::no_such_fn", [full_disk()]).unwrap_err();
    assert!(bug.is_a(&UNKNOWN_CONTRACT_BUG));
    assert_eq!(bug.get("name").unwrap(), &json!("raises_exception::no_such_fn"));
}
