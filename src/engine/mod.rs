//! engine
//!
//! Orchestrates a push session: Gate -> Resolve head -> Push -> Report.
//!
//! # Architecture
//!
//! The engine sits between the CLI and the forge. It receives changes that
//! were already read from local history, checks the caller's expectations
//! against the remote, and feeds the changes through a
//! [`RemoteClient`](crate::forge::RemoteClient) one at a time.
//!
//! # Invariants
//!
//! - Every gate check runs before the first remote write, dry run or not
//! - Changes are applied strictly in order, each on top of the previous one
//! - A failure ends the session; nothing is retried or rolled back
//! - Replay always forces the ref update; push never does
//!
//! # Example
//!
//! ```ignore
//! use commit_headless::engine::{push_changes, PushOptions};
//!
//! let report = push_changes(api, &PushOptions::new(branch), &changes).await?;
//! println!("{} -> {}", report.base, report.head);
//! ```

pub mod gate;
mod push;
mod session;

pub use push::{push_changes, replay_changes, PushError, PushOptions, PushReport};
pub use session::{InvalidTransition, Session, SessionPhase};
