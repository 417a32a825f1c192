//! Run lifecycle state
//!
//! A run moves strictly forward: `Pending -> InProgress -> Complete`.
//! Transition methods never mutate; they return the next state or a
//! [`StateError`] when the move is not allowed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::{JobId, Outcome};

/// Lifecycle state of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunState {
    /// No remote job exists yet
    Pending,
    /// A job was submitted and should be checked again at `next_check_at`
    InProgress {
        job_id: JobId,
        next_check_at: DateTime<Utc>,
    },
    /// Terminal
    Complete {
        outcome: Outcome,
        results: serde_json::Value,
    },
}

/// Rejected state transition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("job id is fixed at {current}, refusing to change it to {requested}")]
    JobIdChanged { current: JobId, requested: JobId },
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::InProgress { .. } => "in_progress",
            RunState::Complete { .. } => "complete",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RunState::Pending)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RunState::Complete { .. })
    }

    /// Job id of the submitted job, if any
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            RunState::InProgress { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    pub fn next_check_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RunState::InProgress { next_check_at, .. } => Some(*next_check_at),
            _ => None,
        }
    }

    /// Whether a dispatcher should look at this run at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self {
            RunState::Pending => true,
            RunState::InProgress { next_check_at, .. } => *next_check_at <= now,
            RunState::Complete { .. } => false,
        }
    }

    /// Moves to `InProgress`
    ///
    /// From `Pending` this records the freshly submitted job. From
    /// `InProgress` only the deadline moves; the job id must match.
    pub fn to_in_progress(
        &self,
        job_id: JobId,
        next_check_at: DateTime<Utc>,
    ) -> Result<RunState, StateError> {
        match self {
            RunState::Pending => Ok(RunState::InProgress {
                job_id,
                next_check_at,
            }),
            RunState::InProgress { job_id: current, .. } => {
                if *current != job_id {
                    return Err(StateError::JobIdChanged {
                        current: current.clone(),
                        requested: job_id,
                    });
                }
                Ok(RunState::InProgress {
                    job_id,
                    next_check_at,
                })
            }
            RunState::Complete { .. } => Err(StateError::InvalidTransition {
                from: self.name(),
                to: "in_progress",
            }),
        }
    }

    /// Refreshes the deadline of an in-progress run, keeping its job id
    pub fn refresh(&self, next_check_at: DateTime<Utc>) -> Result<RunState, StateError> {
        match self {
            RunState::InProgress { job_id, .. } => self.to_in_progress(job_id.clone(), next_check_at),
            _ => Err(StateError::InvalidTransition {
                from: self.name(),
                to: "in_progress",
            }),
        }
    }

    /// Moves an in-progress run to `Complete`
    pub fn to_complete(
        &self,
        outcome: Outcome,
        results: serde_json::Value,
    ) -> Result<RunState, StateError> {
        match self {
            RunState::InProgress { .. } => Ok(RunState::Complete { outcome, results }),
            _ => Err(StateError::InvalidTransition {
                from: self.name(),
                to: "complete",
            }),
        }
    }
}
