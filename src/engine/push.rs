//! engine::push
//!
//! The push orchestrator.
//!
//! # Lifecycle
//!
//! ```text
//! Gate -> Resolve head -> [Create branch] -> Push changes -> Report
//! ```
//!
//! All gate checks and the head comparison happen before the first remote
//! write. The rolling expected head is threaded through
//! [`RemoteClient::push_changes`] as a fold accumulator; no state outlives
//! the call.

use std::sync::Arc;

use thiserror::Error;

use super::gate;
use super::session::{InvalidTransition, Session, SessionPhase};
use crate::core::change::Change;
use crate::core::types::BranchName;
use crate::forge::{ForgeError, RemoteApi, RemoteClient, WriteStep};

/// Errors from a push or replay session.
#[derive(Debug, Error)]
pub enum PushError {
    /// The explicit head sha is not a full SHA-1.
    #[error("invalid head sha '{0}': expected a full 40-character hex commit id")]
    InvalidHeadShaFormat(String),

    /// Branch creation was requested without a starting commit.
    #[error("creating a branch requires a head sha to start it from")]
    MissingCreateBranchBase,

    /// The remote branch moved since the caller read it.
    #[error("remote head is {actual} but {expected} was expected; refusing to overwrite newer commits")]
    HeadShaMismatch {
        /// The head the caller expected
        expected: String,
        /// The head the remote reports
        actual: String,
    },

    /// Some changes were written before one failed.
    #[error("pushed {pushed} of {total} commit(s)")]
    PartialPushFailure {
        /// Changes written
        pushed: usize,
        /// Changes requested
        total: usize,
        /// The write step the next change failed in
        step: Option<WriteStep>,
        /// Why the next one failed
        #[source]
        source: ForgeError,
    },

    /// The session tracker refused a phase change.
    #[error(transparent)]
    Session(#[from] InvalidTransition),

    /// A remote call outside the write loop failed.
    #[error(transparent)]
    Forge(#[from] ForgeError),
}

/// Options for [`push_changes`].
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Remote branch to write to
    pub branch: BranchName,
    /// Expected remote head; `None` means use whatever the remote reports
    pub head_sha: Option<String>,
    /// Create the branch at `head_sha` first
    pub create_branch: bool,
    /// Validate everything, write nothing
    pub dry_run: bool,
}

impl PushOptions {
    pub fn new(branch: BranchName) -> Self {
        Self {
            branch,
            head_sha: None,
            create_branch: false,
            dry_run: false,
        }
    }
}

/// Outcome of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// Number of changes written (or that would have been)
    pub pushed: usize,
    /// Remote head the first change was written on top of
    pub base: String,
    /// New remote head; zeros in dry-run mode
    pub head: String,
    pub dry_run: bool,
}

/// Push `changes` to `options.branch`, oldest first.
///
/// The starting head is resolved as:
///
/// - no head sha: the remote's current head (the branch must exist)
/// - head sha with `create_branch`: a new branch created at that sha
/// - head sha alone: that sha, after checking it is the remote's head
///
/// # Errors
///
/// - [`PushError::InvalidHeadShaFormat`] / [`PushError::MissingCreateBranchBase`]
///   before any remote call
/// - [`PushError::HeadShaMismatch`] before any write
/// - [`PushError::PartialPushFailure`] if a change fails to apply
pub async fn push_changes(
    api: Arc<dyn RemoteApi>,
    options: &PushOptions,
    changes: &[Change],
) -> Result<PushReport, PushError> {
    let mut session = Session::new();

    let head_sha = options
        .head_sha
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(gate::validate_head_sha)
        .transpose()?;
    gate::require_branch_point(head_sha.as_deref(), options.create_branch)?;

    let client = RemoteClient::new(api, options.branch.clone()).dry_run(options.dry_run);

    session.advance(SessionPhase::ResolvingHead)?;
    let base = match head_sha {
        None => client.get_head_commit_hash().await?,
        Some(sha) if options.create_branch => {
            session.advance(SessionPhase::CreatingBranch)?;
            client.create_branch(&sha).await?
        }
        Some(sha) => {
            let actual = client.get_head_commit_hash().await?;
            gate::check_head_matches(&sha, &actual)?;
            sha
        }
    };
    tracing::debug!(branch = %options.branch, base = %base, "resolved starting head");

    run(&client, &mut session, base, changes).await
}

/// Rewrite `branch` as `base` followed by `changes`, forcing the ref update.
///
/// `base` must exist on the remote. Whatever the branch pointed at after
/// `base` is no longer reachable from it afterwards.
pub async fn replay_changes(
    api: Arc<dyn RemoteApi>,
    branch: BranchName,
    base: &str,
    changes: &[Change],
    dry_run: bool,
) -> Result<PushReport, PushError> {
    let mut session = Session::new();
    let client = RemoteClient::new(api, branch).dry_run(dry_run).force(true);

    tracing::info!(branch = %client.branch(), base, count = changes.len(), "replaying changes");
    run(&client, &mut session, base.to_string(), changes).await
}

async fn run(
    client: &RemoteClient,
    session: &mut Session,
    base: String,
    changes: &[Change],
) -> Result<PushReport, PushError> {
    let total = changes.len();
    session.advance(SessionPhase::Pushing { total })?;

    match client.push_changes(&base, changes).await {
        Ok(result) => {
            session.advance(SessionPhase::Done {
                pushed: result.pushed,
            })?;
            Ok(PushReport {
                pushed: result.pushed,
                base,
                head: result.head,
                dry_run: client.is_dry_run(),
            })
        }
        Err(partial) => {
            session.advance(SessionPhase::Failed {
                at: partial.pushed,
                step: partial.source.step().cloned(),
            })?;
            tracing::warn!(phase = %session.phase(), "push session failed");
            Err(PushError::PartialPushFailure {
                pushed: partial.pushed,
                total,
                step: session.failed_step().cloned(),
                source: partial.source,
            })
        }
    }
}
