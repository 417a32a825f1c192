//! Orchestrator backend
//!
//! Submits deploys, tasks and plans to the orchestrator's command endpoints
//! and polls the resulting jobs until they reach a terminal state.
//!
//! Each run kind maps to a fixed submission endpoint, request body and path of
//! the job identifier in the response:
//!
//! | kind   | submit              | job id     | status              |
//! |--------|---------------------|------------|---------------------|
//! | deploy | `command/deploy`    | `job.name` | `jobs/{id}`         |
//! | task   | `command/task`      | `job.name` | `jobs/{id}` + nodes |
//! | plan   | `command/plan_run`  | `name`     | `plan_jobs/{id}`    |

use async_trait::async_trait;
use relay_client::JobClient;
use relay_core::domain::job::{JobId, JobStatus};
use relay_core::domain::run::{Run, RunKind, RunSpec};
use relay_core::domain::state::RunState;
use relay_core::dto::command::{DeployCommand, PlanRunCommand, TaskCommand};
use relay_core::schedule::{Clock, Schedule, SystemClock};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;

use super::{Backend, BackendError, DispatchEvents, TracingEvents};

/// Where and what to submit for a pending run
struct Submission {
    endpoint: &'static str,
    payload: JsonValue,
    /// Path of the job identifier in the response body
    job_id_path: &'static [&'static str],
}

impl Submission {
    fn for_spec(spec: &RunSpec) -> Result<Self, BackendError> {
        let submission = match spec {
            RunSpec::Deploy(deploy) => Self {
                endpoint: "command/deploy",
                payload: serde_json::to_value(DeployCommand::from(deploy))?,
                job_id_path: &["job", "name"],
            },
            RunSpec::Task(task) => Self {
                endpoint: "command/task",
                payload: serde_json::to_value(TaskCommand::from(task))?,
                job_id_path: &["job", "name"],
            },
            RunSpec::Plan(plan) => Self {
                endpoint: "command/plan_run",
                payload: serde_json::to_value(PlanRunCommand::from(plan))?,
                job_id_path: &["name"],
            },
        };

        Ok(submission)
    }

    fn job_id(&self, body: &JsonValue) -> Result<JobId, BackendError> {
        let value = self
            .job_id_path
            .iter()
            .try_fold(body, |value, key| value.get(*key));

        match value {
            Some(JsonValue::String(id)) if !id.is_empty() => Ok(JobId::new(id.as_str())),
            Some(JsonValue::Number(id)) => Ok(JobId::new(id.to_string())),
            _ => Err(BackendError::malformed(
                self.endpoint,
                self.job_id_path.join("."),
            )),
        }
    }
}

fn status_endpoint(kind: RunKind, job_id: &JobId) -> String {
    match kind {
        RunKind::Plan => format!("plan_jobs/{}", job_id),
        RunKind::Deploy | RunKind::Task => format!("jobs/{}", job_id),
    }
}

fn nodes_endpoint(job_id: &JobId) -> String {
    format!("jobs/{}/nodes", job_id)
}

/// Backend talking to the orchestrator
pub struct OrchestratorBackend {
    client: Arc<dyn JobClient>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DispatchEvents>,
    run_kinds: HashSet<RunKind>,
}

impl OrchestratorBackend {
    /// Creates a backend accepting every run kind, using the wall clock and
    /// reporting through `tracing`
    pub fn new(client: Arc<dyn JobClient>) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            events: Arc::new(TracingEvents),
            run_kinds: RunKind::ALL.into_iter().collect(),
        }
    }

    #[allow(dead_code)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[allow(dead_code)]
    pub fn with_events(mut self, events: Arc<dyn DispatchEvents>) -> Self {
        self.events = events;
        self
    }

    /// Restricts the run kinds this backend submits
    pub fn with_run_kinds(mut self, kinds: impl IntoIterator<Item = RunKind>) -> Self {
        self.run_kinds = kinds.into_iter().collect();
        self
    }

    pub fn accepts(&self, kind: RunKind) -> bool {
        self.run_kinds.contains(&kind)
    }

    /// Submits a job for a pending run
    async fn submit(&self, run: &Run, schedule: &dyn Schedule) -> Result<Run, BackendError> {
        let kind = run.kind();
        if !self.accepts(kind) {
            return Err(BackendError::UnsupportedRunType(kind));
        }

        let submission = Submission::for_spec(&run.spec)?;
        let body = self
            .client
            .submit(submission.endpoint, &submission.payload)
            .await?;
        let job_id = submission.job_id(&body)?;

        self.events.info(format!(
            "Orchestrator job {} started for {} run {}",
            job_id, kind, run.id
        ));

        let next_check_at = schedule.next_update_before(self.clock.now());
        let state = run.state.to_in_progress(job_id, next_check_at)?;
        Ok(run.with_state(state))
    }

    /// Checks the job of an in-progress run
    async fn check_complete(
        &self,
        run: &Run,
        job_id: &JobId,
        schedule: &dyn Schedule,
    ) -> Result<Run, BackendError> {
        let kind = run.kind();
        self.events.debug(format!(
            "Checking completion of {} run {} (job {})",
            kind, run.id, job_id
        ));

        let endpoint = status_endpoint(kind, job_id);
        let body = self.client.poll(&endpoint).await?;
        let status = body
            .get("state")
            .and_then(JsonValue::as_str)
            .map(JobStatus::parse)
            .ok_or_else(|| BackendError::malformed(&endpoint, "state"))?;

        let state = match status.outcome() {
            Some(outcome) => {
                let results = match kind {
                    RunKind::Task => self.fetch_node_results(job_id).await?,
                    RunKind::Deploy | RunKind::Plan => body,
                };
                self.events.debug(format!("Run results: {}", results));
                self.events.info(format!(
                    "Orchestrator job {} for {} run {} completed: {}",
                    job_id, kind, run.id, outcome
                ));
                run.state.to_complete(outcome, results)?
            }
            None => {
                if !status.is_recognized() {
                    self.events.warning(format!(
                        "Orchestrator job {} reported unrecognized state '{}', treating it as still running",
                        job_id, status
                    ));
                }
                run.state
                    .refresh(schedule.next_update_before(self.clock.now()))?
            }
        };

        Ok(run.with_state(state))
    }

    /// Per-node results of a task job
    async fn fetch_node_results(&self, job_id: &JobId) -> Result<JsonValue, BackendError> {
        let endpoint = nodes_endpoint(job_id);
        let body = self.client.poll(&endpoint).await?;

        match body.get("items") {
            Some(items) if items.is_array() => Ok(items.clone()),
            _ => Err(BackendError::malformed(&endpoint, "items")),
        }
    }
}

#[async_trait]
impl Backend for OrchestratorBackend {
    async fn execute(&self, run: &Run, schedule: &dyn Schedule) -> Result<Run, BackendError> {
        let result = match &run.state {
            RunState::Pending => self.submit(run, schedule).await,
            RunState::InProgress { job_id, .. } => self.check_complete(run, job_id, schedule).await,
            RunState::Complete { .. } => {
                self.events
                    .debug(format!("Run {} is already complete, nothing to do", run.id));
                Ok(run.clone())
            }
        };

        if let Err(BackendError::Remote(e)) = &result {
            self.events.warning(format!(
                "Failed to send request to orchestrator API: {}, response: {}",
                e,
                e.response_body().unwrap_or("<none>")
            ));
        }

        result
    }
}
