//! Run domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::state::RunState;

/// Unique identifier of a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A unit of work requested by a user
///
/// Runs are values: moving a run forward produces a new `Run` through
/// [`Run::with_state`] and leaves the source run untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub state: RunState,
    #[serde(flatten)]
    pub spec: RunSpec,
}

/// What a run asks the orchestrator to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunSpec {
    Deploy(DeployRun),
    Task(TaskRun),
    Plan(PlanRun),
}

/// Puppet agent run across a scope of nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeployRun {
    pub environment: String,
    /// Target selector, passed through to the orchestrator as-is
    pub scope: serde_json::Value,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub evaltrace: bool,
    #[serde(default)]
    pub noop: bool,
}

/// One-off task execution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskRun {
    pub environment: String,
    pub scope: serde_json::Value,
    /// Task name, e.g. `package::install`
    pub name: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub noop: bool,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Plan execution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanRun {
    pub environment: String,
    pub name: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

/// Discriminant of [`RunSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Deploy,
    Task,
    Plan,
}

impl RunKind {
    pub const ALL: [RunKind; 3] = [RunKind::Deploy, RunKind::Task, RunKind::Plan];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Deploy => "deploy",
            RunKind::Task => "task",
            RunKind::Plan => "plan",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deploy" => Ok(RunKind::Deploy),
            "task" => Ok(RunKind::Task),
            "plan" => Ok(RunKind::Plan),
            other => Err(format!("unknown run kind: {}", other)),
        }
    }
}

impl RunSpec {
    pub fn kind(&self) -> RunKind {
        match self {
            RunSpec::Deploy(_) => RunKind::Deploy,
            RunSpec::Task(_) => RunKind::Task,
            RunSpec::Plan(_) => RunKind::Plan,
        }
    }
}

impl Run {
    /// Creates a new pending run
    pub fn pending(id: impl Into<RunId>, spec: RunSpec) -> Self {
        Self {
            id: id.into(),
            state: RunState::Pending,
            spec,
        }
    }

    pub fn kind(&self) -> RunKind {
        self.spec.kind()
    }

    /// Returns a copy of this run carrying `state`
    pub fn with_state(&self, state: RunState) -> Run {
        Run {
            id: self.id.clone(),
            state,
            spec: self.spec.clone(),
        }
    }
}

impl From<String> for RunId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
