//! API call repository trait

use async_trait::async_trait;
use std::fmt::Debug;
use uuid::Uuid;

use super::{ApiCallRecord, ExperimentSummary};
use crate::domain::LabError;

#[cfg(test)]
use mockall::automock;

/// Persistence for tracked calls
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiCallRepository: Send + Sync + Debug {
    /// Persist a call; returns the stored row
    async fn insert(&self, record: ApiCallRecord) -> Result<ApiCallRecord, LabError>;

    /// Calls of an experiment, newest first
    async fn list_by_experiment(
        &self,
        experiment_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ApiCallRecord>, LabError>;

    /// Aggregate of an experiment's calls
    async fn summarize(&self, experiment_id: Uuid) -> Result<ExperimentSummary, LabError>;
}
