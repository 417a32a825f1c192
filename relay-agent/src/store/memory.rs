//! In-memory run store

use anyhow::Result;
use async_trait::async_trait;
use relay_core::domain::run::{Run, RunId};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::RunStore;

/// Run store backed by a map, ordered by run ID
#[derive(Default)]
pub struct InMemoryRunStore {
    runs: RwLock<BTreeMap<RunId, Run>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `runs`; later duplicates replace earlier ones
    pub fn with_runs(runs: impl IntoIterator<Item = Run>) -> Self {
        let runs = runs.into_iter().map(|run| (run.id.clone(), run)).collect();
        Self {
            runs: RwLock::new(runs),
        }
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn active(&self) -> Result<Vec<Run>> {
        let runs = self.runs.read().await;
        Ok(runs
            .values()
            .filter(|run| !run.state.is_complete())
            .cloned()
            .collect())
    }

    async fn get(&self, id: &RunId) -> Result<Option<Run>> {
        Ok(self.runs.read().await.get(id).cloned())
    }

    async fn save(&self, run: Run) -> Result<()> {
        self.runs.write().await.insert(run.id.clone(), run);
        Ok(())
    }

    async fn remove(&self, id: &RunId) -> Result<Option<Run>> {
        Ok(self.runs.write().await.remove(id))
    }
}
