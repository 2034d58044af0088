//! forge
//!
//! Remote hosting service access.
//!
//! # Architecture
//!
//! The remote is reached through two capability traits, [`BranchApi`] and
//! [`GitDataApi`]. [`RemoteClient`] builds the commit-replication algorithm
//! on top of them and is the only thing the engine talks to.
//!
//! # Modules
//!
//! - `traits`: Capability traits, request types and [`ForgeError`]
//! - `client`: [`RemoteClient`], per-change writes and the sequential fold
//! - [`github`]: GitHub implementation using the REST git-data API
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use commit_headless::forge::{GitHubClient, RemoteClient};
//! use std::sync::Arc;
//!
//! let api = Arc::new(GitHubClient::new(provider, &target, api_base, timeout)?);
//! let client = RemoteClient::new(api, branch);
//! let head = client.get_head_commit_hash().await?;
//! let result = client.push_changes(&head, &changes).await?;
//! ```

mod client;
pub mod github;
pub mod mock;
mod traits;

pub use client::{PartialPush, PushResult, RemoteClient};
pub use github::GitHubClient;
pub use traits::*;
