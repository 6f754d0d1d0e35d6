//! Rendering settings and their layered loader.
//!
//! Settings are applied in layers, later layers overriding earlier ones:
//! 1. Default values
//! 2. A TOML file
//! 3. Environment variables `<PREFIX>_HEADING`, `<PREFIX>_SUBCLASS_NOTE`,
//!    `<PREFIX>_UNDOCUMENTED` and `<PREFIX>_TITLE_INDENT`

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocsError, DocsResult};

/// Settings for rendered contract sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocsConfig {
    /// Heading line of the section.
    pub heading: String,

    /// Appended after a class that has registered subtypes.
    pub subclass_note: String,

    /// Title shown for a class with no title.
    pub undocumented: String,

    /// Indentation of the title line under each class, in spaces.
    pub title_indent: usize,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            heading: "# Raises".to_string(),
            subclass_note: "(or a subclass of it)".to_string(),
            undocumented: "(not documented)".to_string(),
            title_indent: 2,
        }
    }
}

impl DocsConfig {
    /// Loads defaults, then `path` if it exists, then variables under
    /// `env_prefix`.
    pub fn load_from(path: impl AsRef<Path>, env_prefix: &str) -> DocsResult<Self> {
        DocsConfigLoader::new()
            .with_optional_file(path)?
            .with_env_prefix(env_prefix)
            .load()
    }
}

/// Layered loader for [`DocsConfig`].
///
/// # Example
///
/// ```no_run
/// use structex_docs::DocsConfigLoader;
///
/// # fn main() -> Result<(), structex_docs::DocsError> {
/// let config = DocsConfigLoader::new()
///     .with_defaults()
///     .with_file("docs.toml")?
///     .with_env_prefix("STRUCTEX_DOCS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DocsConfigLoader {
    config: DocsConfig,
    env_prefix: Option<String>,
}

impl DocsConfigLoader {
    /// Create a new loader holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = DocsConfig::default();
        self
    }

    /// Load settings from a TOML file.
    ///
    /// Keys missing from the file keep their default values.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> DocsResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DocsError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| DocsError::read_error(path, e))?;
        tracing::debug!(path = %path.display(), "loading docs configuration");
        self.with_string(&content)
    }

    /// Load settings from a TOML file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> DocsResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load settings from a TOML string.
    pub fn with_string(mut self, content: &str) -> DocsResult<Self> {
        self.config = toml::from_str(content)?;
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Finalize, applying environment overrides if a prefix was set.
    pub fn load(mut self) -> DocsResult<DocsConfig> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        Ok(self.config)
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> DocsResult<()> {
        let vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> DocsResult<()> {
        let Some(name) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix('_')) else {
            return Ok(());
        };

        match name {
            "HEADING" => self.config.heading = value.to_string(),
            "SUBCLASS_NOTE" => self.config.subclass_note = value.to_string(),
            "UNDOCUMENTED" => self.config.undocumented = value.to_string(),
            "TITLE_INDENT" => {
                self.config.title_indent = value
                    .parse()
                    .map_err(|_| DocsError::env_parse_error(key, "expected integer"))?;
            }
            _ => {
                tracing::debug!(var = key, "ignoring unknown docs configuration variable");
            }
        }

        Ok(())
    }
}
