//! forge::traits
//!
//! Capability traits for the remote hosting service.
//!
//! # Design
//!
//! The remote surface is split in two so each caller depends only on what
//! it uses and a test double can stand in for either:
//!
//! - [`BranchApi`]: branch head lookup and branch creation
//! - [`GitDataApi`]: content-addressed object writes and ref updates
//!
//! Both traits are async because every call is network I/O. Identifiers
//! returned by the remote are plain strings; the remote, not the client,
//! owns their format.
//!
//! # Example
//!
//! ```ignore
//! use commit_headless::forge::{BranchApi, ForgeError};
//!
//! async fn head(api: &dyn BranchApi) -> Result<String, ForgeError> {
//!     api.get_branch_head("main").await
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

/// Errors from forge operations.
///
/// These map the failure modes of the hosted git-data API. Two of them are
/// singled out because callers branch on them: [`ForgeError::NoRemoteBranch`]
/// and [`ForgeError::BranchPointMissing`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForgeError {
    /// The branch does not exist on the remote.
    #[error("branch '{branch}' does not exist on the remote")]
    NoRemoteBranch {
        /// The branch that was looked up
        branch: String,
    },

    /// The commit a new branch should start from does not exist remotely.
    #[error("branch point {sha} does not exist on the remote")]
    BranchPointMissing {
        /// The requested starting commit
        sha: String,
    },

    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// A response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A failure annotated with the write step it happened in.
    #[error("{step}: {error}")]
    Step {
        /// The step that failed
        step: WriteStep,
        /// The underlying failure
        error: Box<ForgeError>,
    },
}

impl ForgeError {
    /// Wrap this error with the step that produced it.
    pub fn at(self, step: WriteStep) -> Self {
        ForgeError::Step {
            step,
            error: Box::new(self),
        }
    }

    /// The outermost step annotation, if any.
    pub fn step(&self) -> Option<&WriteStep> {
        match self {
            ForgeError::Step { step, .. } => Some(step),
            _ => None,
        }
    }

    /// The innermost error, with step annotations removed.
    pub fn root(&self) -> &ForgeError {
        match self {
            ForgeError::Step { error, .. } => error.root(),
            other => other,
        }
    }
}

/// One remote call in the sequence that writes a single change.
///
/// In order: parent tree lookup, one blob per written file, tree, commit,
/// ref update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStep {
    FetchParentTree,
    CreateBlob { path: String },
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl std::fmt::Display for WriteStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStep::FetchParentTree => write!(f, "get parent commit"),
            WriteStep::CreateBlob { path } => write!(f, "create blob {}", path),
            WriteStep::CreateTree => write!(f, "create tree"),
            WriteStep::CreateCommit => write!(f, "create commit"),
            WriteStep::UpdateRef => write!(f, "update ref"),
        }
    }
}

/// Object type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A file (regular, executable or symlink)
    Blob,
}

impl EntryKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
        }
    }
}

/// One entry of a tree write, merged by the remote over a base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Repository-relative path
    pub path: String,
    /// File mode, e.g. `100644`
    pub mode: String,
    /// Object type
    pub kind: EntryKind,
    /// Blob id, or `None` to remove the path from the base tree
    pub sha: Option<String>,
}

impl TreeEntry {
    /// An entry writing `sha` at `path`.
    pub fn blob(path: impl Into<String>, mode: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: mode.into(),
            kind: EntryKind::Blob,
            sha: Some(sha.into()),
        }
    }

    /// An entry removing `path`.
    pub fn deletion(path: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: mode.into(),
            kind: EntryKind::Blob,
            sha: None,
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.sha.is_none()
    }
}

/// Request to create a commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommitRequest {
    /// Full commit message
    pub message: String,
    /// Tree the commit snapshots
    pub tree: String,
    /// Parent commit ids
    pub parents: Vec<String>,
}

/// Branch lookup and creation.
#[async_trait]
pub trait BranchApi: Send + Sync {
    /// Current head commit of `branch`.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::NoRemoteBranch`] if the branch does not exist
    async fn get_branch_head(&self, branch: &str) -> Result<String, ForgeError>;

    /// Create `branch` pointing at `sha`, returning the id the new ref points at.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::BranchPointMissing`] if `sha` does not exist remotely
    async fn create_branch(&self, branch: &str, sha: &str) -> Result<String, ForgeError>;
}

/// Git object writes and ref updates.
#[async_trait]
pub trait GitDataApi: Send + Sync {
    /// Tree id of commit `sha`.
    async fn get_commit_tree(&self, sha: &str) -> Result<String, ForgeError>;

    /// Store `content` as a blob, returning its id.
    async fn create_blob(&self, content: &[u8]) -> Result<String, ForgeError>;

    /// Create a tree from `base_tree` plus `entries`, returning its id.
    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry])
        -> Result<String, ForgeError>;

    /// Create a commit object, returning its id.
    async fn create_commit(&self, request: CreateCommitRequest) -> Result<String, ForgeError>;

    /// Point `branch` at `sha`. Fast-forward only unless `force` is set.
    async fn update_ref(&self, branch: &str, sha: &str, force: bool) -> Result<(), ForgeError>;
}

/// Both capabilities, as needed by a full push session.
pub trait RemoteApi: BranchApi + GitDataApi {}

impl<T: BranchApi + GitDataApi> RemoteApi for T {}
