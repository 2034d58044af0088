//! auth::provider
//!
//! EnvTokenProvider - TokenProvider backed by environment variables.
//!
//! Variables are consulted in [`TOKEN_VARIABLES`] order and the first
//! non-empty value wins. The lookup happens once, at construction.
//!
//! # Example
//!
//! ```ignore
//! use commit_headless::auth::{EnvTokenProvider, TokenProvider};
//!
//! let provider = EnvTokenProvider::from_env("github.com");
//! if !provider.is_authenticated() {
//!     eprintln!("no token");
//! }
//! ```

use async_trait::async_trait;

use super::errors::AuthError;
use super::{TokenProvider, TOKEN_VARIABLES};

/// Token provider reading a bearer token from the environment.
pub struct EnvTokenProvider {
    host: String,
    token: Option<(&'static str, String)>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for EnvTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvTokenProvider")
            .field("host", &self.host)
            .field("source", &self.source())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl EnvTokenProvider {
    /// Resolve a token from the process environment.
    pub fn from_env(host: impl Into<String>) -> Self {
        Self::with_lookup(host, |name| std::env::var(name).ok())
    }

    /// Resolve a token through `lookup`, which maps a variable name to its value.
    pub fn with_lookup<F>(host: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = TOKEN_VARIABLES.iter().find_map(|&name| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        });

        match &token {
            Some((name, _)) => tracing::debug!(source = name, "resolved API token"),
            None => tracing::debug!("no API token in environment"),
        }

        Self {
            host: host.into(),
            token,
        }
    }

    /// Name of the variable the token came from.
    pub fn source(&self) -> Option<&'static str> {
        self.token.as_ref().map(|(name, _)| *name)
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        match &self.token {
            Some((name, token)) => {
                if token.chars().any(|c| c.is_control()) {
                    return Err(AuthError::InvalidToken(name));
                }
                Ok(token.clone())
            }
            None => Err(AuthError::NotAuthenticated(self.host.clone())),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn provider(vars: &[(&str, &str)]) -> EnvTokenProvider {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvTokenProvider::with_lookup("github.com", move |name| vars.get(name).cloned())
    }

    #[tokio::test]
    async fn headless_token_wins() {
        let p = provider(&[
            ("GH_TOKEN", "gh"),
            ("GITHUB_TOKEN", "github"),
            ("HEADLESS_TOKEN", "headless"),
        ]);
        assert_eq!(p.bearer_token().await.unwrap(), "headless");
        assert_eq!(p.source(), Some("HEADLESS_TOKEN"));
    }

    #[tokio::test]
    async fn github_token_before_gh_token() {
        let p = provider(&[("GH_TOKEN", "gh"), ("GITHUB_TOKEN", "github")]);
        assert_eq!(p.bearer_token().await.unwrap(), "github");
    }

    #[tokio::test]
    async fn empty_values_are_skipped() {
        let p = provider(&[("HEADLESS_TOKEN", "  "), ("GH_TOKEN", "gh")]);
        assert_eq!(p.bearer_token().await.unwrap(), "gh");
    }

    #[tokio::test]
    async fn missing_token_is_not_authenticated() {
        let p = provider(&[]);
        assert!(!p.is_authenticated());
        assert!(matches!(
            p.bearer_token().await,
            Err(AuthError::NotAuthenticated(_))
        ));
    }

    #[tokio::test]
    async fn control_characters_rejected() {
        let p = provider(&[("GITHUB_TOKEN", "abc\u{7}def")]);
        assert!(matches!(
            p.bearer_token().await,
            Err(AuthError::InvalidToken("GITHUB_TOKEN"))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let p = provider(&[("GITHUB_TOKEN", "ghp_secret")]);
        let debug = format!("{:?}", p);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("REDACTED"));
        assert!(debug.contains("github.com"));
    }
}
