//! In-memory baseline repository

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::LabError;
use crate::domain::baseline::{Baseline, BaselineRepository};

#[derive(Debug, Default)]
pub struct InMemoryBaselineRepository {
    baselines: RwLock<HashMap<(Uuid, String), Baseline>>,
}

impl InMemoryBaselineRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaselineRepository for InMemoryBaselineRepository {
    async fn upsert(&self, baseline: Baseline) -> Result<Baseline, LabError> {
        let mut baselines = self
            .baselines
            .write()
            .map_err(|e| LabError::internal(format!("Failed to acquire write lock: {}", e)))?;

        baselines.insert(
            (baseline.experiment_id, baseline.scenario_name.clone()),
            baseline.clone(),
        );

        Ok(baseline)
    }

    async fn find(
        &self,
        experiment_id: Uuid,
        scenario_name: &str,
    ) -> Result<Option<Baseline>, LabError> {
        let baselines = self
            .baselines
            .read()
            .map_err(|e| LabError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(baselines
            .get(&(experiment_id, scenario_name.to_string()))
            .cloned())
    }

    async fn list(&self, experiment_id: Uuid) -> Result<Vec<Baseline>, LabError> {
        let baselines = self
            .baselines
            .read()
            .map_err(|e| LabError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut results: Vec<Baseline> = baselines
            .values()
            .filter(|b| b.experiment_id == experiment_id)
            .cloned()
            .collect();

        results.sort_by(|a, b| a.scenario_name.cmp(&b.scenario_name));
        Ok(results)
    }
}
