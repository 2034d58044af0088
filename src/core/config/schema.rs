//! core::config::schema
//!
//! Configuration file schema.
//!
//! The global and repository files share one schema; repository values
//! override global ones key by key. Endpoints are global-only.
//!
//! # Example
//!
//! ```toml
//! api_base = "https://github.example.com/api/v3"
//! web_base = "https://github.example.com"
//! timeout_secs = 30
//! trailers = ["Signed-off-by: Release Bot <bot@example.com>"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::change::Trailer;

/// One configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// REST API base URL (GitHub Enterprise installs differ)
    pub api_base: Option<String>,

    /// Web UI base URL used for compare links
    pub web_base: Option<String>,

    /// Per-request HTTP timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Trailers appended to every replicated commit body
    pub trailers: Option<Vec<String>>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [("api_base", &self.api_base), ("web_base", &self.web_base)] {
            if let Some(url) = url {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ConfigError::InvalidValue(format!(
                        "{key} must be an http(s) URL, got '{url}'"
                    )));
                }
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be greater than zero".into(),
            ));
        }

        for trailer in self.trailers.iter().flatten() {
            Trailer::parse(trailer).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        Ok(())
    }

    /// Check that a repository-scoped file only sets keys it may set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the file sets an endpoint.
    pub fn validate_repo_scoped(&self, path: &Path) -> Result<(), ConfigError> {
        for (key, value) in [("api_base", &self.api_base), ("web_base", &self.web_base)] {
            if value.is_some() {
                return Err(ConfigError::InvalidValue(format!(
                    "{key} may only be set in the global config, not in '{}'",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`; set keys in `other` win.
    pub fn merged_with(self, other: FileConfig) -> FileConfig {
        FileConfig {
            api_base: other.api_base.or(self.api_base),
            web_base: other.web_base.or(self.web_base),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            trailers: other.trailers.or(self.trailers),
        }
    }
}
