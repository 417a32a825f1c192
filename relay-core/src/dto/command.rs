//! Command endpoint request bodies

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::run::{DeployRun, PlanRun, TaskRun};

/// Body of `POST command/deploy`
///
/// Exactly one of `noop` / `no_noop` is present, and it is always `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployCommand {
    pub environment: String,
    pub scope: serde_json::Value,
    pub debug: bool,
    pub trace: bool,
    pub evaltrace: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noop: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_noop: Option<bool>,
}

impl From<&DeployRun> for DeployCommand {
    fn from(run: &DeployRun) -> Self {
        let (noop, no_noop) = if run.noop {
            (Some(true), None)
        } else {
            (None, Some(true))
        };

        Self {
            environment: run.environment.clone(),
            scope: run.scope.clone(),
            debug: run.debug,
            trace: run.trace,
            evaltrace: run.evaltrace,
            noop,
            no_noop,
        }
    }
}

/// Body of `POST command/task`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCommand {
    pub environment: String,
    pub scope: serde_json::Value,
    pub task: String,
    pub params: HashMap<String, serde_json::Value>,
    pub noop: bool,
    pub targets: Vec<String>,
}

impl From<&TaskRun> for TaskCommand {
    fn from(run: &TaskRun) -> Self {
        Self {
            environment: run.environment.clone(),
            scope: run.scope.clone(),
            task: run.name.clone(),
            params: run.params.clone(),
            noop: run.noop,
            targets: run.targets.clone(),
        }
    }
}

/// Body of `POST command/plan_run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRunCommand {
    pub environment: String,
    pub plan_name: String,
    pub params: HashMap<String, serde_json::Value>,
}

impl From<&PlanRun> for PlanRunCommand {
    fn from(run: &PlanRun) -> Self {
        Self {
            environment: run.environment.clone(),
            plan_name: run.name.clone(),
            params: run.params.clone(),
        }
    }
}
