//! core
//!
//! Core domain types and configuration for commit-headless.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, Target
//! - [`change`] - The replicated unit of change and message composition
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - A [`change::Change`] is immutable once built

pub mod change;
pub mod config;
pub mod types;
