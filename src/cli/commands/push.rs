//! cli::commands::push
//!
//! Push local commits to the remote branch.
//!
//! # Commit selection
//!
//! 1. Revisions given as arguments, in the order given
//! 2. Otherwise hashes piped on stdin, one per line, newest first
//! 3. Otherwise every commit after the remote head (or `--head-sha`)
//!
//! # Example
//!
//! ```bash
//! # Push everything the remote does not have yet
//! commit-headless push -T owner/repo --branch main
//!
//! # Push the branch's commits that are not on main
//! git log --oneline main.. | commit-headless push -T owner/repo --branch feature
//! ```

use std::io::{BufRead, IsTerminal};

use anyhow::{Context as _, Result};

use super::{describe_changes, finish, Context, Workspace};
use crate::cli::args::RemoteArgs;
use crate::core::change::summarize_hashes;
use crate::core::types::Oid;
use crate::engine::{self, gate, PushOptions};
use crate::forge::BranchApi;

/// Run the push command.
pub fn push(
    ctx: &Context,
    remote: &RemoteArgs,
    head_sha: Option<&str>,
    create_branch: bool,
    commits: &[String],
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(push_async(ctx, remote, head_sha, create_branch, commits))
}

async fn push_async(
    ctx: &Context,
    remote: &RemoteArgs,
    head_sha: Option<&str>,
    create_branch: bool,
    commits: &[String],
) -> Result<()> {
    let logger = ctx.logger();
    let workspace = Workspace::prepare(remote)?;
    let head_sha = head_sha.filter(|s| !s.is_empty());

    let mut revisions = commits.to_vec();
    if revisions.is_empty() && !std::io::stdin().is_terminal() {
        revisions = commits_from_reader(std::io::stdin().lock()).context("read commits from stdin")?;
    }

    // Commits computed against the remote head are only valid on top of it.
    let mut expected_head = head_sha.map(str::to_string);
    let oids = if revisions.is_empty() {
        let base = match head_sha {
            Some(sha) => gate::validate_head_sha(sha)?,
            None => workspace
                .api
                .get_branch_head(remote.branch.as_str())
                .await
                .context("get remote head")?,
        };
        let base = Oid::new(base)?;
        expected_head.get_or_insert_with(|| base.as_str().to_string());
        let oids = workspace.git.commits_since(&base)?;
        if oids.is_empty() {
            logger.info(format!("No local commits after {}", base));
        }
        oids
    } else {
        revisions
            .iter()
            .map(|rev| workspace.git.resolve(rev))
            .collect::<Result<Vec<_>, _>>()?
    };

    let changes = workspace.git.changes(&oids).context("get changes")?;
    let changes = workspace.with_trailers(changes);

    logger.group(
        format!(
            "Pushing to {} (branch: {})",
            remote.target, remote.branch
        ),
        format!(
            "Commits: {}",
            summarize_hashes(changes.iter().map(|c| c.hash()))
        ),
    );
    describe_changes(&logger, &changes);

    let options = PushOptions {
        head_sha: expected_head,
        create_branch,
        dry_run: remote.dry_run,
        ..PushOptions::new(remote.branch.clone())
    };
    let report = engine::push_changes(workspace.api.clone(), &options, &changes).await?;

    finish(&logger, &workspace, &remote.target, "pushed", &report)
}

/// Read commit hashes from `reader`, one per line.
///
/// Only the first whitespace-separated field of each line is considered,
/// and only if it looks like an abbreviated or full lowercase hash. Lines
/// arrive newest first, so the result is reversed.
pub fn commits_from_reader(reader: impl BufRead) -> std::io::Result<Vec<String>> {
    let mut commits = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(field) = line.split_whitespace().next() {
            if looks_like_hash(field) {
                commits.push(field.to_string());
            }
        }
    }
    commits.reverse();
    Ok(commits)
}

fn looks_like_hash(field: &str) -> bool {
    (4..=40).contains(&field.len()) && field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_oneline_log_reversed() {
        let input = "abc1234 third\nbcd2345 second\n\n   \ncde3456 first\n";
        let commits = commits_from_reader(input.as_bytes()).unwrap();
        assert_eq!(commits, vec!["cde3456", "bcd2345", "abc1234"]);
    }

    #[test]
    fn skips_non_hash_lines() {
        let input = "warning: something\nabc\nABCDEF0 upper\nfeedbeef ok\n";
        let commits = commits_from_reader(input.as_bytes()).unwrap();
        assert_eq!(commits, vec!["feedbeef"]);
    }

    #[test]
    fn full_hash_accepted() {
        let full = "a".repeat(40);
        let too_long = "a".repeat(41);
        let input = format!("{full}\n{too_long}\n");
        let commits = commits_from_reader(input.as_bytes()).unwrap();
        assert_eq!(commits, vec![full]);
    }
}
