//! A raise contract passing a declared error and converting an undeclared one.
//!
//! Run with `cargo run --example enforcement`.

use anyhow::{anyhow, bail};
use structex::prelude::*;
use structex::response::exception_response;
use structex::roots::BAD_EXCEPTION_BUG;
use structex::telemetry::{init_logging, report, LogConfig};
use thiserror::Error;

/// This error may be returned by `do_operation`.
#[derive(Debug, Error)]
#[error("I am allowed")]
struct Allowed;

/// This error may not be returned by `do_operation`.
#[derive(Debug, Error)]
#[error("I am not allowed")]
struct NotAllowed;

#[raises(native(Allowed, "This error may be returned by do_operation"))]
fn do_operation(ok: bool) -> Result<(), Exception> {
    if ok {
        Err(Allowed.into())
    } else {
        Err(NotAllowed.into())
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::development())?;

    let raises = structex::contract_of("enforcement::do_operation")
        .ok_or_else(|| anyhow!("do_operation has no registered contract"))?;
    print!(
        "{}",
        structex::docs::render_raises(raises, &structex::docs::DocsConfig::default())
    );

    let Err(error) = do_operation(true) else {
        bail!("should not be reached");
    };
    if error.is::<Allowed>() {
        println!("Expected error returned: {error}");
    }

    let Err(error) = do_operation(false) else {
        bail!("should not be reached");
    };
    match error.downcast_ref::<Problem>() {
        Some(bug) if bug.is_a(&BAD_EXCEPTION_BUG) => {
            println!("There is a bug in do_operation: {bug}");
            report(&*error);
            let response = exception_response(&*error);
            println!("It would be served as {}", response.status());
        }
        _ => bail!("contract did not convert the error: {error}"),
    }

    Ok(())
}
