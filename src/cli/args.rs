//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::{BranchName, Target};

/// commit-headless - Replicate local commits on GitHub through the REST API
#[derive(Parser, Debug)]
#[command(name = "commit-headless")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output: warnings, errors and the pushed ref only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Flags shared by every command that writes to the remote.
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Target repository in owner/repo format
    #[arg(short = 'T', long)]
    pub target: Target,

    /// Name of the target branch on the remote
    #[arg(long)]
    pub branch: BranchName,

    /// Perform every check but skip all remote writes
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the local repository
    #[arg(long, default_value = ".")]
    pub repo_path: PathBuf,

    /// Extra `Key: Value` trailer for every commit message (repeatable)
    #[arg(long = "trailer", value_name = "TRAILER")]
    pub trailers: Vec<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Push local commits to the remote branch.
    ///
    /// Commits may be given as revisions, piped on stdin one per line
    /// (newest first, as `git log --oneline` prints them), or omitted, in
    /// which case every commit after the remote head is pushed.
    ///
    /// The remote commits get new hashes. Fetch and reset the local branch
    /// before building on top of them.
    Push {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Expected remote head (full 40-character sha)
        #[arg(long)]
        head_sha: Option<String>,

        /// Create the branch at --head-sha before pushing
        #[arg(long, requires = "head_sha")]
        create_branch: bool,

        /// Commits to push, oldest first
        commits: Vec<String>,
    },

    /// Create one remote commit from the staged changes.
    Commit {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Expected remote head (full 40-character sha)
        #[arg(long)]
        head_sha: Option<String>,

        /// Create the branch at --head-sha before pushing
        #[arg(long, requires = "head_sha")]
        create_branch: bool,

        /// Commit message; repeat for separate paragraphs
        #[arg(short, long = "message", required = true)]
        message: Vec<String>,

        /// Author as 'A U Thor <author@example.com>'
        #[arg(long)]
        author: Option<String>,
    },

    /// Rewrite the remote branch after a base commit.
    ///
    /// Every commit between --since and the current remote head is
    /// recreated through the API and the branch is force-updated to the
    /// result. The remote head must be present locally (run
    /// `git fetch origin <branch>` first).
    Replay {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Base commit to replay from (exclusive)
        #[arg(long)]
        since: String,

        /// Expected remote head (full 40-character sha)
        #[arg(long)]
        head_sha: Option<String>,
    },

    /// Print version information.
    Version,
}
