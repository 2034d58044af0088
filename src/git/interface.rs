//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module is the **single doorway** to the local repository. Every read
//! of local history and of the staging area flows through [`Git`], which
//! returns strong types and typed failure categories.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::DivergedHistory`]: Base commit is not an ancestor of the tip
//! - [`GitError::UnsupportedMergeCommit`]: A commit in the range has several parents
//! - [`GitError::ObjectNotFound`]: Requested commit or blob does not exist
//!
//! # Diff semantics
//!
//! Each commit is diffed against its single parent (or the empty tree for a
//! root commit). Added, modified and type-changed paths carry the new blob
//! content and mode. Deleted paths carry no content. Renames are flattened
//! into a deletion of the old path plus an addition of the new one, since the
//! remote tree API has no notion of a move.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::change::{Change, FileEntry, PLACEHOLDER_AUTHOR};
use crate::core::types::{Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Operation needs a working directory and index.
    #[error("bare repository not supported for this operation")]
    BareRepo,

    /// `base` is not reachable from the upper bound of a range.
    #[error("{base} is not an ancestor of {tip} (histories have diverged, or {base} has not been fetched)")]
    DivergedHistory {
        /// The requested base commit
        base: String,
        /// The tip the range was bounded by
        tip: String,
    },

    /// A commit in the range has more than one parent.
    #[error("range includes a merge commit ({commit}), not continuing")]
    UnsupportedMergeCommit {
        /// The offending commit
        commit: String,
    },

    /// A tree entry that cannot be represented as a file write.
    #[error("unsupported entry {path} (mode {mode}) in {commit}")]
    UnsupportedEntry {
        /// Commit (or `index`) the entry came from
        commit: String,
        /// Repository-relative path
        path: String,
        /// Entry mode as reported by git
        mode: String,
    },

    /// Nothing is staged in the index.
    #[error("no staged changes to commit")]
    NoStagedChanges,

    /// A revision expression did not resolve to a commit.
    #[error("cannot resolve revision '{rev}': {message}")]
    BadRevision {
        /// The revision as given
        rev: String,
        /// Description of the problem
        message: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// A path in a tree or index is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    InvalidPath {
        /// Lossy rendering of the path
        path: String,
    },

    /// `git fetch` exited unsuccessfully.
    #[error("git fetch {remote} {branch} failed: {stderr}")]
    FetchFailed {
        /// Remote name
        remote: String,
        /// Branch that was fetched
        branch: String,
        /// What git reported
        stderr: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            other => GitError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// The Git interface.
///
/// Nothing here writes local branches or the index. [`Git::fetch`] is the
/// only operation that adds objects (and remote-tracking refs).
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// Working directory root, or `None` for bare repositories.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Get the OID HEAD points to.
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    /// Resolve a revision expression (`HEAD~2`, a full or short hash, a
    /// branch name) to a commit OID.
    pub fn resolve(&self, rev: &str) -> Result<Oid, GitError> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|e| GitError::BadRevision {
                rev: rev.to_string(),
                message: e.message().to_string(),
            })?;
        let commit = object.peel_to_commit().map_err(|e| GitError::BadRevision {
            rev: rev.to_string(),
            message: e.message().to_string(),
        })?;
        Ok(Oid::new(commit.id().to_string())?)
    }

    /// Fetch `branch` from `remote` so its commits exist locally.
    ///
    /// Shells out to the `git` binary: `git2` is built without network
    /// transports, and the user's credential helpers only apply to the CLI.
    ///
    /// # Errors
    ///
    /// - [`GitError::FetchFailed`] if git cannot be run or exits non-zero
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        let dir = self.repo.workdir().unwrap_or_else(|| self.repo.path());
        tracing::debug!(remote, branch, dir = %dir.display(), "git fetch");

        let failed = |stderr: String| GitError::FetchFailed {
            remote: remote.to_string(),
            branch: branch.to_string(),
            stderr,
        };
        let output = std::process::Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["fetch", "--quiet", "--no-tags", remote, branch])
            .output()
            .map_err(|e| failed(e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }

    /// Whether the commit exists in the local object database.
    pub fn has_commit(&self, oid: &Oid) -> bool {
        self.find_commit(oid).is_ok()
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        self.repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    // =========================================================================
    // Ancestry and Ranges
    // =========================================================================

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// Returns true if ancestor == descendant (a commit is its own ancestor).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }

        let ancestor_oid = git2::Oid::from_str(ancestor.as_str())
            .map_err(|e| GitError::from_git2(e, ancestor.as_str()))?;
        let descendant_oid = git2::Oid::from_str(descendant.as_str())
            .map_err(|e| GitError::from_git2(e, descendant.as_str()))?;

        self.repo
            .graph_descendant_of(descendant_oid, ancestor_oid)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })
    }

    /// Commits after `base` up to HEAD, oldest first.
    ///
    /// Equivalent to `git rev-list --reverse base..HEAD`.
    ///
    /// # Errors
    ///
    /// - [`GitError::DivergedHistory`] if `base` is not an ancestor of HEAD
    pub fn commits_since(&self, base: &Oid) -> Result<Vec<Oid>, GitError> {
        let head = self.head_oid()?;
        self.commits_between(base, &head)
    }

    /// Commits after `base` up to and including `upper`, oldest first.
    ///
    /// # Errors
    ///
    /// - [`GitError::DivergedHistory`] if `base` is not an ancestor of `upper`
    ///   (including when `base` is not present locally)
    pub fn commits_between(&self, base: &Oid, upper: &Oid) -> Result<Vec<Oid>, GitError> {
        let diverged = || GitError::DivergedHistory {
            base: base.to_string(),
            tip: upper.to_string(),
        };

        let upper_commit = self.find_commit(upper)?;
        let base_commit = self.find_commit(base).map_err(|_| diverged())?;

        if !self.is_ancestor(base, upper)? {
            return Err(diverged());
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        revwalk.push(upper_commit.id())?;
        revwalk.hide(base_commit.id())?;

        let mut commits = Vec::new();
        for oid in revwalk {
            commits.push(Oid::new(oid?.to_string())?);
        }

        tracing::debug!(base = %base, upper = %upper, count = commits.len(), "listed commit range");
        Ok(commits)
    }

    // =========================================================================
    // Change Extraction
    // =========================================================================

    /// Build a [`Change`] for each commit, in the order given.
    pub fn changes(&self, commits: &[Oid]) -> Result<Vec<Change>, GitError> {
        commits.iter().map(|oid| self.change(oid)).collect()
    }

    /// Build the [`Change`] a single commit introduces over its parent.
    ///
    /// # Errors
    ///
    /// - [`GitError::UnsupportedMergeCommit`] if the commit has several parents
    pub fn change(&self, oid: &Oid) -> Result<Change, GitError> {
        let commit = self.find_commit(oid)?;

        if commit.parent_count() > 1 {
            return Err(GitError::UnsupportedMergeCommit {
                commit: oid.to_string(),
            });
        }

        let author = parse_author(commit.raw_header_bytes());
        let message = String::from_utf8_lossy(commit.message_raw_bytes())
            .trim()
            .to_string();

        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };

        let mut diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let entries = self.collect_entries(&mut diff, oid.as_str())?;

        tracing::debug!(commit = %oid, files = entries.len(), "extracted change");

        Ok(Change::builder(oid.as_str())
            .author(author)
            .message(message)
            .entries(entries)
            .build())
    }

    /// Files staged in the index relative to HEAD, with contents and modes.
    ///
    /// On an unborn branch every staged file is an addition.
    ///
    /// # Errors
    ///
    /// - [`GitError::BareRepo`] if there is no working directory
    /// - [`GitError::NoStagedChanges`] if the index matches HEAD
    pub fn staged_changes(&self) -> Result<HashMap<String, FileEntry>, GitError> {
        if self.repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        let head_tree = match self.repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                None
            }
            Err(e) => return Err(e.into()),
        };

        let index = self.repo.index()?;
        let mut diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), None)?;
        let entries = self.collect_entries(&mut diff, "index")?;

        if entries.is_empty() {
            return Err(GitError::NoStagedChanges);
        }
        Ok(entries)
    }

    fn collect_entries(
        &self,
        diff: &mut git2::Diff<'_>,
        source: &str,
    ) -> Result<HashMap<String, FileEntry>, GitError> {
        let mut find = git2::DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let mut entries = HashMap::new();
        for delta in diff.deltas() {
            match delta.status() {
                git2::Delta::Added | git2::Delta::Modified | git2::Delta::Typechange => {
                    let (path, entry) = self.file_entry(&delta.new_file(), source)?;
                    entries.insert(path, entry);
                }
                git2::Delta::Deleted => {
                    entries.insert(diff_path(&delta.old_file())?, FileEntry::deleted());
                }
                git2::Delta::Renamed => {
                    entries.insert(diff_path(&delta.old_file())?, FileEntry::deleted());
                    let (path, entry) = self.file_entry(&delta.new_file(), source)?;
                    entries.insert(path, entry);
                }
                git2::Delta::Copied => {
                    let (path, entry) = self.file_entry(&delta.new_file(), source)?;
                    entries.insert(path, entry);
                }
                _ => {}
            }
        }
        Ok(entries)
    }

    fn file_entry(
        &self,
        file: &git2::DiffFile<'_>,
        source: &str,
    ) -> Result<(String, FileEntry), GitError> {
        let path = diff_path(file)?;
        let mode = match file.mode() {
            git2::FileMode::Blob => "100644",
            git2::FileMode::BlobExecutable => "100755",
            git2::FileMode::Link => "120000",
            other => {
                return Err(GitError::UnsupportedEntry {
                    commit: source.to_string(),
                    path,
                    mode: format!("{other:?}"),
                })
            }
        };

        let blob = self
            .repo
            .find_blob(file.id())
            .map_err(|e| GitError::from_git2(e, &format!("{source}:{path}")))?;

        Ok((path, FileEntry::file(blob.content().to_vec(), mode)))
    }
}

fn diff_path(file: &git2::DiffFile<'_>) -> Result<String, GitError> {
    let bytes = file.path_bytes().ok_or_else(|| GitError::InvalidPath {
        path: String::new(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| GitError::InvalidPath {
        path: String::from_utf8_lossy(bytes).into_owned(),
    })
}

/// Extract `Name <email>` from a raw commit header.
///
/// The author line reads `author Name <email> timestamp tz`; everything up
/// to the last `>` is kept. A missing or malformed author is replaced with
/// [`PLACEHOLDER_AUTHOR`] rather than failing the whole range.
fn parse_author(header: &[u8]) -> String {
    let header = String::from_utf8_lossy(header);
    let value = header
        .lines()
        .take_while(|line| !line.is_empty())
        .find_map(|line| line.strip_prefix("author "));

    match value.and_then(|v| v.rfind('>').map(|idx| &v[..=idx])) {
        Some(author) => author.to_string(),
        None => {
            tracing::warn!(author = ?value, "author is malformed, using placeholder");
            PLACEHOLDER_AUTHOR.to_string()
        }
    }
}
