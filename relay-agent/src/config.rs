//! Agent configuration
//!
//! Defines all configurable parameters for the agent including
//! polling intervals, orchestrator connection settings and accepted run kinds.

use anyhow::Context;
use relay_core::domain::run::RunKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique identifier for this agent instance
    pub agent_id: String,

    /// Orchestrator base URL (e.g., "https://pe.example.com:8143/orchestrator/v1")
    pub orchestrator_url: String,

    /// RBAC token sent to the orchestrator
    pub orchestrator_token: Option<String>,

    /// How often the scheduler looks for due runs
    pub poll_interval: Duration,

    /// How long to wait before checking an in-progress job again
    pub check_interval: Duration,

    /// Timeout applied to every orchestrator request
    pub request_timeout: Duration,

    /// Max runs dispatched at the same time
    pub max_parallel_runs: usize,

    /// JSON file of runs loaded at startup
    pub runs_file: Option<PathBuf>,

    /// Run kinds this agent submits
    pub run_kinds: Vec<RunKind>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(agent_id: String, orchestrator_url: String) -> Self {
        Self {
            agent_id,
            orchestrator_url,
            orchestrator_token: None,
            poll_interval: Duration::from_secs(5),
            check_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_parallel_runs: 4,
            runs_file: None,
            run_kinds: RunKind::ALL.to_vec(),
        }
    }

    /// Loads configuration from environment variables
    ///
    /// Falls back to defaults only when ORCHESTRATOR_URL is unset; any other
    /// invalid setting is an error.
    ///
    /// Expected environment variables:
    /// - ORCHESTRATOR_URL (required)
    /// - AGENT_ID (optional, default: random UUID)
    /// - ORCHESTRATOR_TOKEN (optional)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - CHECK_INTERVAL (optional, seconds, default: 10)
    /// - REQUEST_TIMEOUT (optional, seconds, default: 30)
    /// - MAX_PARALLEL_RUNS (optional, default: 4)
    /// - RUNS_FILE (optional)
    /// - RUN_KINDS (optional, comma separated, default: deploy,task,plan)
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    fn load_with(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let config = if lookup("ORCHESTRATOR_URL").is_none() {
            warn!("ORCHESTRATOR_URL not set, using default configuration");
            Self::default()
        } else {
            Self::from_vars(&lookup).context("Invalid configuration in environment")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds configuration from a variable lookup
    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let orchestrator_url = lookup("ORCHESTRATOR_URL")
            .ok_or_else(|| anyhow::anyhow!("ORCHESTRATOR_URL environment variable not set"))?;

        let agent_id = lookup("AGENT_ID").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut config = Self::new(agent_id, orchestrator_url);

        config.orchestrator_token = lookup("ORCHESTRATOR_TOKEN").filter(|token| !token.is_empty());

        if let Some(interval) = parse_secs(lookup("POLL_INTERVAL")) {
            config.poll_interval = interval;
        }

        if let Some(interval) = parse_secs(lookup("CHECK_INTERVAL")) {
            config.check_interval = interval;
        }

        if let Some(timeout) = parse_secs(lookup("REQUEST_TIMEOUT")) {
            config.request_timeout = timeout;
        }

        if let Some(max) = lookup("MAX_PARALLEL_RUNS").and_then(|s| s.parse::<usize>().ok()) {
            config.max_parallel_runs = max;
        }

        config.runs_file = lookup("RUNS_FILE").map(PathBuf::from);

        if let Some(kinds) = lookup("RUN_KINDS") {
            config.run_kinds = parse_run_kinds(&kinds)
                .with_context(|| format!("Invalid RUN_KINDS value {:?}", kinds))?;
        }

        Ok(config)
    }

    /// Adds a token for the orchestrator
    #[allow(dead_code)]
    pub fn with_token(mut self, token: String) -> Self {
        self.orchestrator_token = Some(token);
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.agent_id.is_empty() {
            anyhow::bail!("agent_id cannot be empty");
        }

        if self.orchestrator_url.is_empty() {
            anyhow::bail!("orchestrator_url cannot be empty");
        }

        if !self.orchestrator_url.starts_with("http://")
            && !self.orchestrator_url.starts_with("https://")
        {
            anyhow::bail!("orchestrator_url must start with http:// or https://");
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.check_interval.as_secs() == 0 {
            anyhow::bail!("check_interval must be greater than 0");
        }

        if self.request_timeout.as_secs() == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_parallel_runs == 0 {
            anyhow::bail!("max_parallel_runs must be greater than 0");
        }

        if self.run_kinds.is_empty() {
            anyhow::bail!("run_kinds cannot be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            "http://localhost:8143/orchestrator/v1".to_string(),
        )
    }
}

fn parse_secs(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Parses a comma separated list such as "deploy, task"
fn parse_run_kinds(value: &str) -> anyhow::Result<Vec<RunKind>> {
    let mut kinds = Vec::new();
    for part in value.split(',').filter(|part| !part.trim().is_empty()) {
        let kind = part.parse::<RunKind>().map_err(|e| anyhow::anyhow!(e))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}
