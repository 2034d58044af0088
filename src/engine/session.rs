//! engine::session
//!
//! Phase tracking for one push session.
//!
//! ```text
//! Idle -> ResolvingHead -> [CreatingBranch] -> Pushing -> Done
//!                                                 \-> Failed
//! ```
//!
//! Phases only move forward. A failed session is finished and remembers
//! which change and which write step it stopped at; a new run starts again
//! from the remote head as it is then.

use std::fmt;

use thiserror::Error;

use crate::forge::WriteStep;

/// Where a session is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    ResolvingHead,
    CreatingBranch,
    Pushing { total: usize },
    Done { pushed: usize },
    /// Change number `at` (zero-based) failed, during `step` if known.
    Failed { at: usize, step: Option<WriteStep> },
}

impl SessionPhase {
    fn rank(&self) -> u8 {
        match self {
            SessionPhase::Idle => 0,
            SessionPhase::ResolvingHead => 1,
            SessionPhase::CreatingBranch => 2,
            SessionPhase::Pushing { .. } => 3,
            SessionPhase::Done { .. } | SessionPhase::Failed { .. } => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Done { .. } | SessionPhase::Failed { .. })
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::ResolvingHead => write!(f, "resolving head"),
            SessionPhase::CreatingBranch => write!(f, "creating branch"),
            SessionPhase::Pushing { total } => write!(f, "pushing {} change(s)", total),
            SessionPhase::Done { pushed } => write!(f, "done ({} pushed)", pushed),
            SessionPhase::Failed { at, step: None } => write!(f, "failed at change {}", at + 1),
            SessionPhase::Failed {
                at,
                step: Some(step),
            } => write!(f, "failed at change {} ({})", at + 1, step),
        }
    }
}

/// A phase change that would move a session backwards or out of a
/// finished state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
}

/// Forward-only phase tracker.
#[derive(Debug)]
pub struct Session {
    phase: SessionPhase,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// [`InvalidTransition`] for a backward move or a move out of a
    /// terminal phase. The phase is left unchanged.
    pub fn advance(&mut self, next: SessionPhase) -> Result<(), InvalidTransition> {
        if self.phase.is_terminal() || next.rank() <= self.phase.rank() {
            return Err(InvalidTransition {
                from: self.phase.clone(),
                to: next,
            });
        }
        tracing::debug!(from = %self.phase, to = %next, "session transition");
        self.phase = next;
        Ok(())
    }

    /// The step a failed session stopped at.
    pub fn failed_step(&self) -> Option<&WriteStep> {
        match &self.phase {
            SessionPhase::Failed { step, .. } => step.as_ref(),
            _ => None,
        }
    }
}
