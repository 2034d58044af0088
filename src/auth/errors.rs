//! auth::errors
//!
//! Authentication error types.
//!
//! # Design
//!
//! Error messages never contain token values; they name the variables that
//! were searched instead.
//!
//! # Example
//!
//! ```
//! use commit_headless::auth::AuthError;
//!
//! let err = AuthError::NotAuthenticated("github.com".to_string());
//! assert!(err.to_string().contains("github.com"));
//! ```

use thiserror::Error;

use super::TOKEN_VARIABLES;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token is available for the host.
    #[error("not authenticated for host '{0}'. Set one of {vars}.", vars = TOKEN_VARIABLES.join(", "))]
    NotAuthenticated(String),

    /// A token was found but cannot be sent as a header value.
    #[error("token from {0} contains characters not allowed in an HTTP header")]
    InvalidToken(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_authenticated_lists_variables() {
        let msg = AuthError::NotAuthenticated("github.com".into()).to_string();
        for var in TOKEN_VARIABLES {
            assert!(msg.contains(var), "{msg} should mention {var}");
        }
    }

    #[test]
    fn invalid_token_names_source_only() {
        let msg = AuthError::InvalidToken("GITHUB_TOKEN").to_string();
        assert!(msg.contains("GITHUB_TOKEN"));
    }
}
