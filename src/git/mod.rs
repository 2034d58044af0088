//! git
//!
//! Single interface for reading the local repository.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. No other module should import
//! `git2`, and nothing shells out to the git CLI.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Revision resolution and ancestry checks
//! - Ordered commit-range listing (oldest first)
//! - Per-commit change extraction against the single parent
//! - Staged (index) change extraction
//!
//! # Example
//!
//! ```ignore
//! use commit_headless::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let base = git.resolve("origin/main")?;
//! let commits = git.commits_since(&base)?;
//! let changes = git.changes(&commits)?;
//! ```

mod interface;

pub use interface::{Git, GitError};
