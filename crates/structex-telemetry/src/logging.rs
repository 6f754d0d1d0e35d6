//! Structured logging for structex programs.
//!
//! Installs a `tracing-subscriber` formatter (pretty or JSON) filtered by an
//! `EnvFilter` directive, and reports problems at the level their root
//! implies.
//!
//! # Example
//!
//! ```rust,ignore
//! use structex_telemetry::logging::{LogConfig, init_logging};
//!
//! let config = LogConfig::default();
//! init_logging(&config)?;
//!
//! tracing::info!(path = "/", "reserving space");
//! ```

use std::error::Error as StdError;

use structex_core::Problem;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "structex_core=debug,warn").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            include_target: true,
            file_line_info: false,
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            include_target: true,
            file_line_info: true,
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            include_target: true,
            file_line_info: false,
        }
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidLevel` for a bad filter directive and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns error if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidLevel(e.to_string()))
}

/// How a reported error was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A descendant of `ERROR`: an outcome the caller can act on.
    Expected,
    /// A bug, or an error outside both roots.
    Defect,
}

/// Classifies an error by its problem root.
pub fn classify(error: &(dyn StdError + 'static)) -> Severity {
    match error.downcast_ref::<Problem>() {
        Some(problem) if problem.is_error() => Severity::Expected,
        _ => Severity::Defect,
    }
}

/// Joins the `source()` chain below `error`, outermost first.
pub fn cause_chain(error: &(dyn StdError + 'static)) -> Option<String> {
    let mut causes = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    if causes.is_empty() {
        None
    } else {
        Some(causes.join(": "))
    }
}

/// Logs `error` at the level its classification implies.
pub fn report(error: &(dyn StdError + 'static)) -> Severity {
    let severity = classify(error);
    let problem = error.downcast_ref::<Problem>();
    let typename = problem.map_or("<native>", Problem::typename);
    let status = problem.map(Problem::status);
    let cause = cause_chain(error);

    match severity {
        Severity::Expected => {
            tracing::warn!(problem = typename, status, error = %error, "problem reported");
        }
        Severity::Defect => {
            tracing::error!(
                problem = typename,
                status,
                error = %error,
                cause = cause.as_deref(),
                "defect reported"
            );
        }
    }
    severity
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use structex_core::fixtures::{FAILED, INSUFFICIENT_SPACE};
    use structex_core::{Exception, Raises};

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_production_config() {
        let config = LogConfig::production();
        assert!(config.json_format);
        assert!(!config.file_line_info);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("structex_core=debug,warn").is_ok());
        assert!(matches!(
            create_env_filter("structex_core=notalevel"),
            Err(TelemetryError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_classify_and_report() {
        let full = INSUFFICIENT_SPACE
            .instantiate([
                ("path", json!("/")),
                ("avail", json!(0)),
                ("need", json!(1)),
            ])
            .unwrap();
        assert_eq!(classify(&full), Severity::Expected);
        assert_eq!(report(&full), Severity::Expected);

        let io = std::io::Error::other("disk on fire");
        assert_eq!(report(&io), Severity::Defect);
    }

    #[test]
    fn test_converted_error_keeps_cause_chain() {
        let failed = FAILED.instantiate([("what", json!("launch"))]).unwrap();
        let bug = Raises::nothing().enforce(Box::new(failed));
        assert_eq!(classify(&*bug), Severity::Defect);
        assert_eq!(cause_chain(&*bug).as_deref(), Some("Failed to launch"));

        let plain: Exception = "no cause".into();
        assert_eq!(cause_chain(&*plain), None);
    }
}
