//! Declaring a problem type, raising it and reading its content back.
//!
//! Run with `cargo run --example insufficient_space`.

use anyhow::{anyhow, bail};
use structex::prelude::*;
use structex::telemetry::{init_logging, LogConfig};

declare_problem! {
    /// Raised when a filesystem has insufficient space.
    pub static INSUFFICIENT_SPACE: InsufficientSpace(ERROR) {
        status = 507;
        detail = "Filesystem {path} has only {avail} bytes free, need {need}";
        path: Str => "The filesystem mount point";
        avail: Int => "Number of bytes free on the filesystem";
        need: Int => "Number of bytes needed";
    }
}

#[raises(INSUFFICIENT_SPACE)]
fn copy_file_to_dest(src: &str, dst: &str) -> Result<(), Exception> {
    let problem = problem!(INSUFFICIENT_SPACE, path = dst, avail = 100, need = 300)?;
    tracing::debug!(src, dst, "copy refused");
    println!("{}", problem.to_json());
    Err(problem.into())
}

fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::development())?;

    let Err(error) = copy_file_to_dest("a", "b") else {
        bail!("copy unexpectedly succeeded");
    };

    let problem = error
        .downcast_ref::<Problem>()
        .filter(|problem| problem.is_a(&INSUFFICIENT_SPACE))
        .ok_or_else(|| anyhow!("unexpected error: {error}"))?;

    println!("{problem}");

    let need: i64 = problem.get_as("need")?;
    let avail: i64 = problem.get_as("avail")?;
    println!(
        "Please free at least {} bytes, or try a different filesystem",
        need - avail
    );

    Ok(())
}
