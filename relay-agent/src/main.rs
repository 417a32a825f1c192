//! Relay Agent
//!
//! Drives deploys, tasks and plans through the orchestrator until they finish.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Store: The runs this agent is responsible for
//! - Backend: One step of a run's lifecycle against the orchestrator
//! - Scheduler: Picks due runs every tick and dispatches them
//!
//! Pending runs get a job submitted; in-progress runs have their job checked
//! once their deadline passes; completed runs are reported and dropped.

mod backend;
mod config;
mod scheduler;
mod store;

use anyhow::{Context, Result};
use relay_client::OrchestratorClient;
use relay_core::schedule::FixedInterval;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::backend::OrchestratorBackend;
use crate::config::Config;
use crate::scheduler::RunPoller;
use crate::store::{InMemoryRunStore, load_runs};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Relay Agent");

    let config = Config::load()?;
    info!(
        "Loaded configuration: agent_id={}, orchestrator_url={}",
        config.agent_id, config.orchestrator_url
    );

    let client = build_client(&config)?;
    info!("Orchestrator client initialized");

    let backend = OrchestratorBackend::new(Arc::new(client))
        .with_run_kinds(config.run_kinds.iter().copied());
    info!(
        "Accepting run kinds: {}",
        config
            .run_kinds
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let store = match &config.runs_file {
        Some(path) => InMemoryRunStore::with_runs(load_runs(path)?),
        None => InMemoryRunStore::new(),
    };
    info!("Loaded {} run(s)", store.len().await);

    let schedule = Arc::new(FixedInterval::new(config.check_interval));
    let poller = RunPoller::new(&config, Arc::new(backend), Arc::new(store), schedule);

    info!(
        "Poll interval: {:?}, check interval: {:?}, max parallel runs: {}",
        config.poll_interval, config.check_interval, config.max_parallel_runs
    );

    tokio::select! {
        result = poller.run() => {
            if let Err(e) = &result {
                error!("Poller error: {}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

/// Builds the orchestrator client with the configured timeout and token
fn build_client(config: &Config) -> Result<OrchestratorClient> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(format!("relay-agent/{}", config.agent_id))
        .build()
        .context("Failed to build HTTP client")?;

    let client = OrchestratorClient::with_client(config.orchestrator_url.clone(), http);

    Ok(match &config.orchestrator_token {
        Some(token) => client.with_token(token.clone()),
        None => client,
    })
}
