//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$COMMIT_HEADLESS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/commit-headless/config.toml`
//! 3. `<platform config dir>/commit-headless/config.toml`
//!
//! # Repo Config Location
//!
//! `.commit-headless.toml` at the repository root. The endpoints
//! (`api_base`, `web_base`) may only come from the global file, since the
//! token is sent to them and the repository content is not trusted.
//!
//! # Example
//!
//! ```no_run
//! use commit_headless::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! println!("API: {}", config.api_base());
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::change::Trailer;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default GitHub web base URL.
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Name of the repository-scoped config file.
pub const REPO_CONFIG_FILE: &str = ".commit-headless.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: FileConfig,
    sources: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo_root` is provided, also loads the repository's config file.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or fail
    /// validation. Missing config files are not an error.
    pub fn load(repo_root: Option<&Path>) -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        Self::load_from(global.as_deref(), repo_root)
    }

    /// Load configuration from an explicit global file and repository root.
    pub fn load_from(global: Option<&Path>, repo_root: Option<&Path>) -> Result<Self, ConfigError> {
        let mut values = FileConfig::default();
        let mut sources = Vec::new();

        let candidates = global
            .map(|path| (path.to_path_buf(), false))
            .into_iter()
            .chain(repo_root.map(|root| (root.join(REPO_CONFIG_FILE), true)));

        for (path, repo_scoped) in candidates {
            if !path.is_file() {
                continue;
            }
            let file = Self::read_config(&path)?;
            file.validate()?;
            if repo_scoped {
                file.validate_repo_scoped(&path)?;
            }
            tracing::debug!(path = %path.display(), "loaded config file");
            values = values.merged_with(file);
            sources.push(path);
        }

        Ok(Self { values, sources })
    }

    /// Locate the global config file, if one exists.
    fn global_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("COMMIT_HEADLESS_CONFIG") {
            return Some(PathBuf::from(path));
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("commit-headless/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::config_dir().map(|dir| dir.join("commit-headless/config.toml"))
    }

    fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Files that contributed to this configuration, lowest precedence first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn api_base(&self) -> &str {
        self.values.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn web_base(&self) -> &str {
        self.values.web_base.as_deref().unwrap_or(DEFAULT_WEB_BASE)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.values.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Configured trailers, parsed. Values were validated at load time.
    pub fn trailers(&self) -> Vec<Trailer> {
        self.values
            .trailers
            .iter()
            .flatten()
            .filter_map(|t| Trailer::parse(t).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(None, Some(dir.path())).unwrap();
        assert_eq!(config.api_base(), DEFAULT_API_BASE);
        assert_eq!(config.web_base(), DEFAULT_WEB_BASE);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.trailers().is_empty());
        assert!(config.sources().is_empty());
    }

    #[test]
    fn repo_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        fs::write(&global, "timeout_secs = 5\napi_base = \"https://a.example\"\n").unwrap();
        fs::write(
            dir.path().join(REPO_CONFIG_FILE),
            "timeout_secs = 9\ntrailers = [\"Foo: bar\"]\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&global), Some(dir.path())).unwrap();
        assert_eq!(config.api_base(), "https://a.example");
        assert_eq!(config.timeout(), Duration::from_secs(9));
        assert_eq!(config.trailers().len(), 1);
        assert_eq!(config.sources().len(), 2);
    }

    #[test]
    fn repo_file_cannot_redirect_endpoints() {
        for key in ["api_base", "web_base"] {
            let dir = TempDir::new().unwrap();
            fs::write(
                dir.path().join(REPO_CONFIG_FILE),
                format!("{key} = \"https://attacker.example\"\n"),
            )
            .unwrap();

            let err = Config::load_from(None, Some(dir.path())).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(_)));
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REPO_CONFIG_FILE);
        fs::write(&path, "this is = = not toml").unwrap();

        let err = Config::load_from(None, Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains(REPO_CONFIG_FILE));
    }

    #[test]
    fn invalid_value_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(REPO_CONFIG_FILE), "timeout_secs = 0\n").unwrap();
        let err = Config::load_from(None, Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
