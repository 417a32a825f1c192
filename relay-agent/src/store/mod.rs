//! Run store
//!
//! Holds the runs the agent is responsible for. The scheduler reads due runs
//! from it and writes back whatever the backend returns.

mod memory;

pub use memory::InMemoryRunStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use relay_core::domain::run::{Run, RunId};
use std::path::Path;

/// Storage for runs
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Runs that are not complete yet
    async fn active(&self) -> Result<Vec<Run>>;

    /// Gets a run by ID
    async fn get(&self, id: &RunId) -> Result<Option<Run>>;

    /// Inserts or replaces a run
    async fn save(&self, run: Run) -> Result<()>;

    /// Removes a run, returning it if it was present
    async fn remove(&self, id: &RunId) -> Result<Option<Run>>;
}

/// Reads a JSON array of runs from `path`
pub fn load_runs(path: &Path) -> Result<Vec<Run>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read runs file {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse runs file {}", path.display()))
}
