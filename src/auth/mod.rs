//! auth
//!
//! Bearer token resolution for the remote API.
//!
//! # Components
//!
//! - [`TokenProvider`] - Trait for providing bearer tokens to forge adapters
//! - [`EnvTokenProvider`] - Implementation reading the process environment
//! - [`AuthError`] - Failure to produce a usable token
//!
//! # Security
//!
//! Tokens never appear in logs (including `--debug`), error messages or
//! debug output. Types holding a token implement a redacting `Debug`.

mod errors;
mod provider;

pub use errors::AuthError;
pub use provider::EnvTokenProvider;

use async_trait::async_trait;

/// Environment variables searched for a token, highest precedence first.
pub const TOKEN_VARIABLES: [&str; 3] = ["HEADLESS_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"];

/// Trait for providing bearer tokens to forge adapters.
///
/// Implementors must never log or expose token values.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the bearer token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if no token exists
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Check if authentication is available.
    fn is_authenticated(&self) -> bool;
}

/// A fixed token, for tests and embedding.
pub struct StaticTokenProvider {
    host: String,
    token: String,
}

impl StaticTokenProvider {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("host", &self.host)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}
