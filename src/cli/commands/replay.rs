//! cli::commands::replay
//!
//! Recreate the remote branch's commits after a base through the API and
//! force the branch onto the result.
//!
//! Useful when a branch holds commits that were pushed some other way and
//! should be replaced by API-created (and therefore signed) ones.
//!
//! # Preconditions
//!
//! - The remote head must exist locally; if it does not, the branch is
//!   fetched from `origin` first
//! - `--since` must be an ancestor of the remote head
//!
//! The ref update is forced: anything pushed to the branch between reading
//! its head and the final update is lost. Pass `--head-sha` to at least pin
//! the starting point.

use anyhow::{ensure, Context as _, Result};

use super::{describe_changes, finish, Context, Workspace};
use crate::cli::args::RemoteArgs;
use crate::core::change::summarize_hashes;
use crate::core::types::Oid;
use crate::engine::{self, gate};
use crate::forge::BranchApi;

/// Remote the branch is fetched from when its head is missing locally.
const FETCH_REMOTE: &str = "origin";

/// Run the replay command.
pub fn replay(
    ctx: &Context,
    remote: &RemoteArgs,
    since: &str,
    head_sha: Option<&str>,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(replay_async(ctx, remote, since, head_sha))
}

async fn replay_async(
    ctx: &Context,
    remote: &RemoteArgs,
    since: &str,
    head_sha: Option<&str>,
) -> Result<()> {
    let logger = ctx.logger();
    let workspace = Workspace::prepare(remote)?;

    let since = workspace
        .git
        .resolve(since)
        .with_context(|| format!("resolve --since {}", since))?;

    let remote_head = workspace
        .api
        .get_branch_head(remote.branch.as_str())
        .await
        .context("get remote head")?;

    if let Some(expected) = head_sha.filter(|s| !s.is_empty()) {
        let expected = gate::validate_head_sha(expected)?;
        gate::check_head_matches(&expected, &remote_head)?;
    }

    let upper = Oid::new(remote_head.clone())?;
    if !workspace.git.has_commit(&upper) {
        logger.info(format!(
            "Fetching {} {} for remote head {}",
            FETCH_REMOTE, remote.branch, upper
        ));
        workspace
            .git
            .fetch(FETCH_REMOTE, remote.branch.as_str())
            .context("fetch remote branch")?;
        ensure!(
            workspace.git.has_commit(&upper),
            "remote head {} is still missing after fetching {} {}",
            upper,
            FETCH_REMOTE,
            remote.branch
        );
    }

    let oids = workspace
        .git
        .commits_between(&since, &upper)
        .context("list commits to replay")?;
    if oids.is_empty() {
        logger.notice(format!(
            "No commits to replay (--since {} is already at remote HEAD)",
            since
        ));
        return Ok(());
    }

    let changes = workspace.git.changes(&oids).context("get changes")?;
    let changes = workspace.with_trailers(changes);

    logger.group(
        format!("Replaying to {} (branch: {})", remote.target, remote.branch),
        format!(
            "Commits to replay: {}\nBase commit: {}",
            summarize_hashes(changes.iter().map(|c| c.hash())),
            since
        ),
    );
    describe_changes(&logger, &changes);

    let report = engine::replay_changes(
        workspace.api.clone(),
        remote.branch.clone(),
        since.as_str(),
        &changes,
        remote.dry_run,
    )
    .await?;

    finish(&logger, &workspace, &remote.target, "replayed", &report)
}
