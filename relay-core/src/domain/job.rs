//! Orchestrator job domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a job in the orchestrator
///
/// The orchestrator reports this as the job's `name` (e.g. "42").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Job status as reported in the `state` field of a job status response
///
/// Deploy and task jobs report `new`, `ready`, `running`, `stopping` while
/// executing and `finished` or `failed` once done. Plan jobs report `success`
/// when done. Anything else is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    New,
    Ready,
    Running,
    Stopping,
    Finished,
    Failed,
    Success,
    Other(String),
}

impl JobStatus {
    /// Parses a status string from the orchestrator
    pub fn parse(status: &str) -> Self {
        match status {
            "new" => Self::New,
            "ready" => Self::Ready,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "finished" => Self::Finished,
            "failed" => Self::Failed,
            "success" => Self::Success,
            other => Self::Other(other.to_string()),
        }
    }

    /// The outcome this status completes a run with, if it is terminal
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Finished => Some(Outcome::Finished),
            Self::Failed => Some(Outcome::Failed),
            Self::Success => Some(Outcome::Success),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Whether this is a status the orchestrator is known to report
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Success => "success",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a run, taken from the job's final status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Finished,
    Failed,
    Success,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Finished => "finished",
            Outcome::Failed => "failed",
            Outcome::Success => "success",
        };
        f.write_str(s)
    }
}
