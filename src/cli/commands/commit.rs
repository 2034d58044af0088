//! cli::commands::commit
//!
//! Create a single remote commit from the staged changes.
//!
//! The index is compared against the local HEAD tree; nothing is committed
//! locally. Paragraphs from repeated `--message` flags are joined with a
//! blank line.

use anyhow::{Context as _, Result};

use super::{describe_changes, finish, Context, Workspace};
use crate::cli::args::RemoteArgs;
use crate::core::change::Change;
use crate::core::types::Oid;
use crate::engine::{self, PushOptions};

/// Run the commit command.
pub fn commit(
    ctx: &Context,
    remote: &RemoteArgs,
    head_sha: Option<&str>,
    create_branch: bool,
    message: &[String],
    author: Option<&str>,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commit_async(
        ctx,
        remote,
        head_sha,
        create_branch,
        message,
        author,
    ))
}

async fn commit_async(
    ctx: &Context,
    remote: &RemoteArgs,
    head_sha: Option<&str>,
    create_branch: bool,
    message: &[String],
    author: Option<&str>,
) -> Result<()> {
    let logger = ctx.logger();
    let workspace = Workspace::prepare(remote)?;

    let entries = workspace.git.staged_changes().context("get staged changes")?;
    let change = staged_change(entries, message, author);
    let changes = workspace.with_trailers(vec![change]);

    logger.group(
        format!("Committing to {} (branch: {})", remote.target, remote.branch),
        format!("Staged files: {}", changes[0].entries().len()),
    );
    describe_changes(&logger, &changes);

    let options = PushOptions {
        head_sha: head_sha.map(str::to_string),
        create_branch,
        dry_run: remote.dry_run,
        ..PushOptions::new(remote.branch.clone())
    };
    let report = engine::push_changes(workspace.api.clone(), &options, &changes).await?;

    finish(&logger, &workspace, &remote.target, "pushed", &report)
}

/// A change with no local commit behind it; its hash is all zeros.
/// Without an author no `Co-authored-by` trailer is added.
fn staged_change(
    entries: std::collections::HashMap<String, crate::core::change::FileEntry>,
    message: &[String],
    author: Option<&str>,
) -> Change {
    Change::builder(Oid::zero().as_str())
        .author(author.map(str::trim).unwrap_or_default())
        .message(message.join("\n\n"))
        .entries(entries)
        .build()
}
