//! Backend layer
//!
//! A backend drives one step of a run's lifecycle against some job-execution
//! service: submit a job for a pending run, or check on the job of an
//! in-progress run. It never persists anything; the scheduler stores the run
//! it returns.

mod events;
mod orchestrator;

pub use events::{DispatchEvents, TracingEvents};
pub use orchestrator::OrchestratorBackend;

#[cfg(test)]
pub use events::{EventLevel, RecordingEvents};

use async_trait::async_trait;
use relay_client::ClientError;
use relay_core::domain::run::{Run, RunKind};
use relay_core::domain::state::StateError;
use relay_core::schedule::Schedule;
use thiserror::Error;

/// Errors raised while dispatching a run
///
/// When `execute` fails the caller's run is unchanged and should be treated as
/// still being in its previous state.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The job-execution service rejected a request or could not be reached
    #[error("request to orchestrator API failed: {0}")]
    Remote(#[from] ClientError),

    /// This backend does not submit runs of this kind
    #[error("unsupported run type: {0}")]
    UnsupportedRunType(RunKind),

    /// A response lacked a field the backend depends on
    #[error("malformed response from {endpoint}: missing or invalid field `{field}`")]
    MalformedResponse { endpoint: String, field: String },

    /// Failed to encode a request body
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    State(#[from] StateError),
}

impl BackendError {
    pub fn malformed(endpoint: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.into(),
            field: field.into(),
        }
    }
}

/// One step of the run state machine
#[async_trait]
pub trait Backend: Send + Sync {
    /// Advances `run` by one step and returns the updated run
    ///
    /// Pending runs get a job submitted, in-progress runs get their job
    /// checked. Complete runs are returned unchanged without any remote call;
    /// callers should stop dispatching a run once it is complete.
    ///
    /// Calls for the same run must not overlap.
    async fn execute(&self, run: &Run, schedule: &dyn Schedule) -> Result<Run, BackendError>;
}
