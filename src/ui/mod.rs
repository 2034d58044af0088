//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Human-readable messages, Actions workflow commands and
//!   output values
//!
//! # Design
//!
//! All user-facing output goes through this module so the same run reads
//! well in a terminal and in a GitHub Actions log.

pub mod output;
