//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`Target`] - Remote repository coordinates (`owner/repo`)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a malformed `--target` or `--branch` is
//! rejected before any repository or network work starts.
//!
//! # Examples
//!
//! ```
//! use commit_headless::core::types::{BranchName, Oid, Target};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! assert_eq!(branch.as_str(), "feature/my-branch");
//!
//! let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
//! assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
//!
//! let target: Target = "octocat/hello-world".parse().unwrap();
//! assert_eq!(target.owner(), "octocat");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!("no-slash".parse::<Target>().is_err());
//! ```

use std::str::FromStr;

use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid target '{0}': must be of the form owner/repo with exactly one slash")]
    InvalidTarget(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('-') {
            return reject("branch name cannot start with '-'");
        }
        if name.ends_with('/') {
            return reject("branch name cannot end with '/'");
        }
        for seq in ["..", "@{", "//"] {
            if name.contains(seq) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{seq}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{c}'"
                )));
            }
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        // Component rules also cover a leading '.' and trailing ".lock"
        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BranchName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use commit_headless::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
///
/// assert_eq!(Oid::zero().as_str(), "0".repeat(40));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(String);

impl Oid {
    /// The zero OID (40 zeros for SHA-1).
    const ZERO_SHA1: &'static str = "0000000000000000000000000000000000000000";

    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Create the zero/null OID (40 zeros).
    pub fn zero() -> Self {
        Self(Self::ZERO_SHA1.to_string())
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that `sha` is a full 40-hex-digit commit hash.
///
/// Expected-head values supplied by callers must be complete SHA-1 ids;
/// abbreviations are ambiguous on the remote side.
///
/// # Example
///
/// ```
/// use commit_headless::core::types::is_full_sha1;
///
/// assert!(is_full_sha1("f8034fe40034a602c232b8cbe06ab79e518f71c1"));
/// assert!(!is_full_sha1("f8034fe"));
/// assert!(!is_full_sha1("F8034FE40034A602C232B8CBE06AB79E518F71C1"));
/// ```
pub fn is_full_sha1(sha: &str) -> bool {
    sha.len() == 40 && sha.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Remote repository coordinates in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    owner: String,
    repo: String,
}

impl Target {
    /// Create a target from its parts.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTarget` if either part is empty or contains a slash.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, TypeError> {
        let (owner, repo) = (owner.into(), repo.into());
        if owner.is_empty() || repo.is_empty() || owner.contains('/') || repo.contains('/') {
            return Err(TypeError::InvalidTarget(format!("{owner}/{repo}")));
        }
        Ok(Self { owner, repo })
    }

    /// Repository owner (user or organization).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl FromStr for Target {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.matches('/').count() != 1 {
            return Err(TypeError::InvalidTarget(s.to_string()));
        }
        let (owner, repo) = s
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidTarget(s.to_string()))?;
        Self::new(owner, repo).map_err(|_| TypeError::InvalidTarget(s.to_string()))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
