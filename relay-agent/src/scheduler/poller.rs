//! Run poller
//!
//! Looks for due runs on every tick and dispatches them to the backend.
//! Each run is dispatched in its own task; a cycle waits for all of its
//! dispatches before the next tick, so a run is never in flight twice.

use anyhow::{Context, Result};
use relay_core::domain::run::Run;
use relay_core::domain::state::RunState;
use relay_core::schedule::{Clock, Schedule, SystemClock};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendError};
use crate::config::Config;
use crate::store::RunStore;

/// What happened to the runs of one poll cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Runs handed to the backend
    pub dispatched: usize,
    /// Runs that reached `Complete` and left the store
    pub completed: usize,
    /// Runs whose dispatch failed; they stay as they were
    pub failed: usize,
    /// Due runs left for the next cycle because all slots were busy
    pub deferred: usize,
}

enum Dispatch {
    Advanced,
    Completed,
    Failed,
}

/// Poller that continuously dispatches due runs
pub struct RunPoller {
    poll_interval: Duration,
    backend: Arc<dyn Backend>,
    store: Arc<dyn RunStore>,
    schedule: Arc<dyn Schedule>,
    clock: Arc<dyn Clock>,
    semaphore: Arc<Semaphore>,
}

impl RunPoller {
    /// Creates a new run poller
    pub fn new(
        config: &Config,
        backend: Arc<dyn Backend>,
        store: Arc<dyn RunStore>,
        schedule: Arc<dyn Schedule>,
    ) -> Self {
        Self {
            poll_interval: config.poll_interval,
            backend,
            store,
            schedule,
            clock: Arc::new(SystemClock),
            semaphore: Arc::new(Semaphore::new(config.max_parallel_runs)),
        }
    }

    #[allow(dead_code)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts the polling loop
    pub async fn run(&self) -> Result<()> {
        info!("Starting run poller (interval: {:?})", self.poll_interval);

        let mut interval = time::interval(self.poll_interval);

        loop {
            interval.tick().await;

            debug!("Polling for due runs");

            match self.poll_once().await {
                Ok(report) => {
                    if report.dispatched > 0 {
                        info!(
                            "Dispatched {} run(s) this cycle: {} completed, {} failed, {} deferred",
                            report.dispatched, report.completed, report.failed, report.deferred
                        );
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    /// Performs a single poll cycle
    pub async fn poll_once(&self) -> Result<CycleReport> {
        let now = self.clock.now();
        let due: Vec<Run> = self
            .store
            .active()
            .await
            .context("Failed to list active runs")?
            .into_iter()
            .filter(|run| run.state.is_due(now))
            .collect();

        let mut report = CycleReport::default();

        if due.is_empty() {
            debug!("No runs due");
            return Ok(report);
        }

        debug!("Found {} due run(s)", due.len());

        let mut handles = Vec::new();

        for run in due {
            // Try to acquire semaphore permit, defer if at max capacity
            if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
                handles.push(self.spawn_dispatch(run, permit));
            } else {
                debug!("Max parallel runs reached, deferring run {}", run.id);
                report.deferred += 1;
            }
        }

        report.dispatched = handles.len();

        for handle in handles {
            match handle.await {
                Ok(Dispatch::Advanced) => {}
                Ok(Dispatch::Completed) => report.completed += 1,
                Ok(Dispatch::Failed) => report.failed += 1,
                Err(e) => {
                    warn!("Dispatch task panicked: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Spawns a task dispatching a single run
    fn spawn_dispatch(&self, run: Run, permit: OwnedSemaphorePermit) -> JoinHandle<Dispatch> {
        let backend = Arc::clone(&self.backend);
        let store = Arc::clone(&self.store);
        let schedule = Arc::clone(&self.schedule);

        tokio::spawn(async move {
            let _permit = permit;
            Self::dispatch(run, backend, store, schedule).await
        })
    }

    /// Advances one run and stores the result
    async fn dispatch(
        run: Run,
        backend: Arc<dyn Backend>,
        store: Arc<dyn RunStore>,
        schedule: Arc<dyn Schedule>,
    ) -> Dispatch {
        let next = match backend.execute(&run, schedule.as_ref()).await {
            Ok(next) => next,
            Err(BackendError::UnsupportedRunType(kind)) => {
                error!(
                    "Run {} has type {} which this agent does not submit, dropping it",
                    run.id, kind
                );
                if let Err(e) = store.remove(&run.id).await {
                    error!("Failed to drop run {}: {:#}", run.id, e);
                }
                return Dispatch::Failed;
            }
            Err(e) => {
                error!("Failed to dispatch {} run {}: {}", run.kind(), run.id, e);
                return Dispatch::Failed;
            }
        };

        if let RunState::Complete { outcome, results } = &next.state {
            info!("Run {} completed with outcome {}", next.id, outcome);
            debug!("Run {} results: {}", next.id, results);

            return match store.remove(&next.id).await {
                Ok(_) => Dispatch::Completed,
                Err(e) => {
                    error!("Failed to remove completed run {}: {:#}", next.id, e);
                    Dispatch::Failed
                }
            };
        }

        if next == run {
            return Dispatch::Advanced;
        }

        match store.save(next).await {
            Ok(()) => Dispatch::Advanced,
            Err(e) => {
                error!("Failed to save run {}: {:#}", run.id, e);
                Dispatch::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRunStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use relay_client::ClientError;
    use relay_core::domain::job::{JobId, Outcome};
    use relay_core::domain::run::{DeployRun, RunId, RunKind, RunSpec};
    use relay_core::schedule::{FixedClock, FixedInterval};
    use std::sync::Mutex;

    /// Moves pending runs to job "1" and in-progress runs to complete
    #[derive(Default)]
    struct StepBackend {
        failing: Vec<&'static str>,
        unsupported: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Backend for StepBackend {
        async fn execute(&self, run: &Run, schedule: &dyn Schedule) -> Result<Run, BackendError> {
            self.calls.lock().unwrap().push(run.id.to_string());

            if self.failing.iter().any(|id| *id == run.id.as_str()) {
                return Err(ClientError::api_error(503, "unavailable").into());
            }
            if self.unsupported.iter().any(|id| *id == run.id.as_str()) {
                return Err(BackendError::UnsupportedRunType(run.kind()));
            }

            let state = match &run.state {
                RunState::Pending => run
                    .state
                    .to_in_progress(JobId::new("1"), schedule.next_update_before(now()))?,
                RunState::InProgress { .. } => run
                    .state
                    .to_complete(Outcome::Finished, serde_json::json!({"state": "finished"}))?,
                RunState::Complete { .. } => run.state.clone(),
            };
            Ok(run.with_state(state))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn pending(id: &str) -> Run {
        Run::pending(id, RunSpec::Deploy(DeployRun::default()))
    }

    fn waiting_until(id: &str, at: DateTime<Utc>) -> Run {
        let run = pending(id);
        let state = run.state.to_in_progress(JobId::new("1"), at).unwrap();
        run.with_state(state)
    }

    fn make_poller(
        backend: Arc<StepBackend>,
        store: Arc<InMemoryRunStore>,
        max_parallel_runs: usize,
    ) -> RunPoller {
        let mut config = Config::default();
        config.max_parallel_runs = max_parallel_runs;
        RunPoller::new(
            &config,
            backend,
            store,
            Arc::new(FixedInterval::new(std::time::Duration::from_secs(10))),
        )
        .with_clock(Arc::new(FixedClock(now())))
    }

    #[tokio::test]
    async fn test_pending_run_is_submitted_and_saved() {
        let backend = Arc::new(StepBackend::default());
        let store = Arc::new(InMemoryRunStore::with_runs([pending("a")]));

        let report = make_poller(backend.clone(), store.clone(), 4)
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report.dispatched, 1);
        assert_eq!(report.completed, 0);
        let saved = store.get(&RunId::new("a")).await.unwrap().unwrap();
        assert_eq!(saved.state.job_id(), Some(&JobId::new("1")));
        assert_eq!(
            saved.state.next_check_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 10).unwrap())
        );
    }

    #[tokio::test]
    async fn test_runs_not_due_are_left_alone() {
        let backend = Arc::new(StepBackend::default());
        let later = now() + chrono::Duration::seconds(30);
        let store = Arc::new(InMemoryRunStore::with_runs([waiting_until("a", later)]));

        let report = make_poller(backend.clone(), store.clone(), 4)
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report, CycleReport::default());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completed_runs_leave_the_store() {
        let backend = Arc::new(StepBackend::default());
        let store = Arc::new(InMemoryRunStore::with_runs([waiting_until("a", now())]));

        let report = make_poller(backend.clone(), store.clone(), 4)
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report.completed, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_failed_dispatch_leaves_run_unchanged() {
        let backend = Arc::new(StepBackend {
            failing: vec!["bad"],
            ..Default::default()
        });
        let store = Arc::new(InMemoryRunStore::with_runs([pending("bad"), pending("good")]));

        let report = make_poller(backend.clone(), store.clone(), 4)
            .poll_once()
            .await
            .unwrap();

        assert_eq!(report.dispatched, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            store.get(&RunId::new("bad")).await.unwrap(),
            Some(pending("bad"))
        );
        assert!(
            store
                .get(&RunId::new("good"))
                .await
                .unwrap()
                .unwrap()
                .state
                .job_id()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_unsupported_run_is_dropped() {
        let backend = Arc::new(StepBackend {
            unsupported: vec!["plan-1"],
            ..Default::default()
        });
        let store = Arc::new(InMemoryRunStore::with_runs([pending("plan-1")]));

        let report = make_poller(backend, store.clone(), 4).poll_once().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_runs_beyond_capacity_are_deferred() {
        let backend = Arc::new(StepBackend::default());
        let store = Arc::new(InMemoryRunStore::with_runs([pending("a"), pending("b")]));
        let poller = make_poller(backend.clone(), store.clone(), 1);

        let first = poller.poll_once().await.unwrap();
        assert_eq!(first.dispatched, 1);
        assert_eq!(first.deferred, 1);

        // "a" is now waiting for its check, "b" gets the free slot
        let second = poller.poll_once().await.unwrap();
        assert_eq!(second.dispatched, 1);
        assert_eq!(second.deferred, 0);
        assert_eq!(*backend.calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_each_run_dispatched_once_per_cycle() {
        let backend = Arc::new(StepBackend::default());
        let store = Arc::new(InMemoryRunStore::with_runs([
            pending("a"),
            waiting_until("b", now()),
        ]));

        make_poller(backend.clone(), store.clone(), 4)
            .poll_once()
            .await
            .unwrap();

        let mut calls = backend.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(calls, vec!["a", "b"]);
        assert_eq!(
            store.get(&RunId::new("a")).await.unwrap().unwrap().kind(),
            RunKind::Deploy
        );
    }
}
