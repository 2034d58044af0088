//! commit-headless - Replicate local git commits onto a GitHub branch
//!
//! Commits are recreated one by one through the GitHub git-data API
//! (blobs, trees, commits, refs) instead of a `git push`, so the resulting
//! commits are created, and signed, by the API.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Orchestrates a session: Gate → Resolve head → Push → Report
//! - [`core`] - Change model, domain types and configuration
//! - [`git`] - Reads changes out of the local repository
//! - [`forge`] - Remote API abstraction, GitHub client and in-memory mock
//! - [`auth`] - Token discovery from the environment
//! - [`ui`] - Plain and GitHub Actions output
//!
//! # Correctness Invariants
//!
//! 1. Changes are applied in order, each on top of the previous remote commit
//! 2. The branch is only moved with a fast-forward update, except by replay
//! 3. Every precondition is checked before the first remote write
//! 4. Dry runs make no remote writes

pub mod auth;
pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod ui;
