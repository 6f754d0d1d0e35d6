//! Logging for structex programs.
//!
//! The library crates only emit `tracing` events; this crate installs a
//! subscriber for them and offers a helper to report problems the way the
//! framework classifies them:
//!
//! - **Errors** are expected outcomes, reported at `warn`
//! - **Bugs** are defects, reported at `error` together with their cause chain
//! - **Other errors** have no contract guarantees and are reported as bugs
//!
//! # Example
//!
//! ```rust,ignore
//! use structex_telemetry::{init_logging, report, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! if let Err(error) = reserve("/", 1 << 40) {
//!     report(&*error);
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/structex-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, report, LogConfig, Severity};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
