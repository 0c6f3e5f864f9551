//! Baseline repository trait

use async_trait::async_trait;
use std::fmt::Debug;
use uuid::Uuid;

use super::Baseline;
use crate::domain::LabError;

/// Persistence for baselines, unique per (experiment, scenario)
#[async_trait]
pub trait BaselineRepository: Send + Sync + Debug {
    /// Insert, or replace the row with the same experiment and scenario
    async fn upsert(&self, baseline: Baseline) -> Result<Baseline, LabError>;

    async fn find(
        &self,
        experiment_id: Uuid,
        scenario_name: &str,
    ) -> Result<Option<Baseline>, LabError>;

    async fn list(&self, experiment_id: Uuid) -> Result<Vec<Baseline>, LabError>;
}
