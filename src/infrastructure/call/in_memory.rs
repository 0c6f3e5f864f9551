//! In-memory API call repository

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::LabError;
use crate::domain::call::{ApiCallRecord, ApiCallRepository, ExperimentSummary};

/// Calls grouped by experiment, in insertion order
#[derive(Debug, Default)]
pub struct InMemoryApiCallRepository {
    calls: RwLock<HashMap<Uuid, Vec<ApiCallRecord>>>,
}

impl InMemoryApiCallRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiCallRepository for InMemoryApiCallRepository {
    async fn insert(&self, record: ApiCallRecord) -> Result<ApiCallRecord, LabError> {
        let mut calls = self
            .calls
            .write()
            .map_err(|e| LabError::internal(format!("Failed to acquire write lock: {}", e)))?;

        calls
            .entry(record.experiment_id)
            .or_default()
            .push(record.clone());

        Ok(record)
    }

    async fn list_by_experiment(
        &self,
        experiment_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ApiCallRecord>, LabError> {
        let calls = self
            .calls
            .read()
            .map_err(|e| LabError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut results = calls.get(&experiment_id).cloned().unwrap_or_default();

        // newest first; stable so equal timestamps keep latest insert first
        results.reverse();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(results.into_iter().take(limit.unwrap_or(usize::MAX)).collect())
    }

    async fn summarize(&self, experiment_id: Uuid) -> Result<ExperimentSummary, LabError> {
        let calls = self
            .calls
            .read()
            .map_err(|e| LabError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(calls
            .get(&experiment_id)
            .map(ExperimentSummary::from_records)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::NewApiCall;
    use crate::domain::pricing::{CostBreakdown, TokenBreakdown};
    use crate::domain::provider::ProviderKind;
    use chrono::{Duration, Utc};

    fn record(experiment_id: Uuid, offset_secs: i64, cost: f64) -> ApiCallRecord {
        NewApiCall::new(
            experiment_id,
            "sess_1",
            ProviderKind::OpenAi,
            "gpt-4o-mini",
            TokenBreakdown::new(100, 50, 0),
        )
        .with_latency_ms(200)
        .with_timestamp(Utc::now() + Duration::seconds(offset_secs))
        .into_record(&CostBreakdown {
            total: cost,
            ..CostBreakdown::default()
        })
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_limited() {
        let repo = InMemoryApiCallRepository::new();
        let experiment = Uuid::new_v4();

        let old = repo.insert(record(experiment, -10, 0.1)).await.unwrap();
        let new = repo.insert(record(experiment, 0, 0.2)).await.unwrap();
        repo.insert(record(Uuid::new_v4(), 5, 0.3)).await.unwrap();

        let all = repo.list_by_experiment(experiment, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, new.id);
        assert_eq!(all[1].id, old.id);

        let limited = repo.list_by_experiment(experiment, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, new.id);
    }

    #[tokio::test]
    async fn test_summarize() {
        let repo = InMemoryApiCallRepository::new();
        let experiment = Uuid::new_v4();

        repo.insert(record(experiment, 0, 0.1)).await.unwrap();
        repo.insert(record(experiment, 1, 0.2)).await.unwrap();

        let summary = repo.summarize(experiment).await.unwrap();
        assert_eq!(summary.call_count, 2);
        assert!((summary.total_cost - 0.3).abs() < 1e-9);
        assert_eq!(summary.total_tokens, 300);
        assert!((summary.average_latency_ms - 200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_experiment_is_empty() {
        let repo = InMemoryApiCallRepository::new();
        let experiment = Uuid::new_v4();

        assert!(repo.list_by_experiment(experiment, None).await.unwrap().is_empty());
        assert_eq!(
            repo.summarize(experiment).await.unwrap(),
            ExperimentSummary::default()
        );
    }
}
