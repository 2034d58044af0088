//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the local repository and loads configuration
//! 2. Reads the changes to replicate
//! 3. Calls the engine to push them
//! 4. Reports the result and publishes the new head
//!
//! # Async Commands
//!
//! Remote commands are async because they involve network I/O. Each
//! handler creates a `tokio` runtime and blocks on its async body.

mod commit;
mod push;
mod replay;
mod version;

pub use commit::commit;
pub use push::{commits_from_reader, push};
pub use replay::replay;
pub use version::version;

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};

use super::args::{Command, RemoteArgs};
use crate::auth::{EnvTokenProvider, TokenProvider, TOKEN_VARIABLES};
use crate::core::change::{Change, Trailer};
use crate::core::config::Config;
use crate::core::types::Target;
use crate::engine::PushReport;
use crate::forge::GitHubClient;
use crate::git::Git;
use crate::ui::output::{Logger, Verbosity};

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    pub fn logger(&self) -> Logger {
        Logger::from_env(Verbosity::from_flags(self.quiet, self.debug))
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Push {
            remote,
            head_sha,
            create_branch,
            commits,
        } => push(ctx, &remote, head_sha.as_deref(), create_branch, &commits),
        Command::Commit {
            remote,
            head_sha,
            create_branch,
            message,
            author,
        } => commit(
            ctx,
            &remote,
            head_sha.as_deref(),
            create_branch,
            &message,
            author.as_deref(),
        ),
        Command::Replay {
            remote,
            since,
            head_sha,
        } => replay(ctx, &remote, &since, head_sha.as_deref()),
        Command::Version => version(),
    }
}

/// Everything a remote command needs, prepared from its flags.
pub(crate) struct Workspace {
    pub git: Git,
    pub config: Config,
    pub trailers: Vec<Trailer>,
    pub api: Arc<GitHubClient>,
}

impl Workspace {
    pub fn prepare(remote: &RemoteArgs) -> Result<Self> {
        let git = Git::open(&remote.repo_path)
            .with_context(|| format!("open repository at {}", remote.repo_path.display()))?;
        let config = Config::load(git.workdir()).context("load configuration")?;

        let mut trailers = config.trailers();
        for text in &remote.trailers {
            trailers.push(Trailer::parse(text).with_context(|| format!("--trailer {:?}", text))?);
        }

        let host = reqwest::Url::parse(config.web_base())
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| "github.com".to_string());
        let provider = EnvTokenProvider::from_env(host);
        if !provider.is_authenticated() {
            bail!(
                "no GitHub token supplied; set one of {}",
                TOKEN_VARIABLES.join(", ")
            );
        }

        let api = GitHubClient::new(
            Arc::new(provider),
            &remote.target,
            config.api_base(),
            config.timeout(),
        )
        .context("create GitHub client")?;

        Ok(Self {
            git,
            config,
            trailers,
            api: Arc::new(api),
        })
    }

    /// Attach the configured and per-invocation trailers.
    pub fn with_trailers(&self, changes: Vec<Change>) -> Vec<Change> {
        changes
            .into_iter()
            .map(|c| c.into_builder().trailers(self.trailers.iter().cloned()).build())
            .collect()
    }
}

/// Web URL comparing two commits.
pub fn compare_url(web_base: &str, target: &Target, base: &str, head: &str) -> String {
    format!(
        "{}/{}/{}/compare/{}...{}",
        web_base.trim_end_matches('/'),
        target.owner(),
        target.repo(),
        base,
        head
    )
}

/// Debug-level listing of what each change carries.
fn describe_changes(logger: &Logger, changes: &[Change]) {
    if logger.verbosity() != Verbosity::Debug {
        return;
    }
    for change in changes {
        let mut paths: Vec<_> = change.entries().iter().collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));
        let files: Vec<String> = paths
            .into_iter()
            .map(|(path, entry)| {
                let action = if entry.is_deletion() { "DELETE" } else { "MODIFY" };
                format!("    - {}: {}", action, path)
            })
            .collect();
        logger.info(format!(
            "Commit {}\n  Headline: {}\n  Changed files: {}\n{}",
            change.hash(),
            change.headline(),
            files.len(),
            files.join("\n")
        ));
    }
}

/// Announce a finished session and publish its head as `pushed_ref`.
fn finish(
    logger: &Logger,
    workspace: &Workspace,
    target: &Target,
    verb: &str,
    report: &PushReport,
) -> Result<()> {
    if report.dry_run {
        logger.notice(format!(
            "Dry run: would have {} {} commit(s) onto {}",
            verb, report.pushed, report.base
        ));
    } else {
        logger.notice(format!(
            "{} {} commit(s): {}",
            capitalize(verb),
            report.pushed,
            compare_url(workspace.config.web_base(), target, &report.base, &report.head)
        ));
    }

    logger
        .output("pushed_ref", &report.head)
        .context("write output")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
