//! Baseline manager: creates, fetches and compares scenario baselines

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::LabError;
use crate::domain::baseline::{Baseline, BaselineComparison, BaselineRepository, CallAverages};
use crate::domain::call::ApiCallRecord;

#[derive(Debug, Clone)]
pub struct BaselineManager {
    repository: Arc<dyn BaselineRepository>,
}

impl BaselineManager {
    pub fn new(repository: Arc<dyn BaselineRepository>) -> Self {
        Self { repository }
    }

    /// Aggregate calls into a baseline, replacing any stored one for the scenario
    pub async fn create_baseline(
        &self,
        experiment_id: Uuid,
        scenario_name: &str,
        calls: &[ApiCallRecord],
        now: DateTime<Utc>,
    ) -> Result<Baseline, LabError> {
        let baseline = Baseline::from_calls(experiment_id, scenario_name, calls, now)
            .map_err(|e| LabError::validation(e.to_string()))?;

        let stored = self.repository.upsert(baseline).await?;

        tracing::info!(
            experiment_id = %stored.experiment_id,
            scenario = %stored.scenario_name,
            sample_size = stored.sample_size,
            "Baseline stored"
        );

        Ok(stored)
    }

    pub async fn get_baseline(
        &self,
        experiment_id: Uuid,
        scenario_name: &str,
    ) -> Result<Option<Baseline>, LabError> {
        self.repository.find(experiment_id, scenario_name).await
    }

    pub async fn list_baselines(&self, experiment_id: Uuid) -> Result<Vec<Baseline>, LabError> {
        self.repository.list(experiment_id).await
    }

    /// Compare later calls against the stored baseline of a scenario
    pub async fn compare(
        &self,
        experiment_id: Uuid,
        scenario_name: &str,
        calls: &[ApiCallRecord],
    ) -> Result<BaselineComparison, LabError> {
        let current =
            CallAverages::from_calls(calls).map_err(|e| LabError::validation(e.to_string()))?;

        let baseline = self
            .repository
            .find(experiment_id, scenario_name)
            .await?
            .ok_or_else(|| {
                LabError::baseline_not_found(experiment_id.to_string(), scenario_name)
            })?;

        Ok(baseline.compare(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::NewApiCall;
    use crate::domain::pricing::{CostBreakdown, TokenBreakdown};
    use crate::domain::provider::ProviderKind;
    use crate::infrastructure::baseline::InMemoryBaselineRepository;

    fn manager() -> BaselineManager {
        BaselineManager::new(Arc::new(InMemoryBaselineRepository::new()))
    }

    fn call(experiment_id: Uuid, tokens: u64, cost: f64, latency_ms: u64) -> ApiCallRecord {
        NewApiCall::new(
            experiment_id,
            "sess_1",
            ProviderKind::OpenAi,
            "gpt-4o",
            TokenBreakdown::new(tokens, 0, 0),
        )
        .with_latency_ms(latency_ms)
        .into_record(&CostBreakdown {
            total: cost,
            ..CostBreakdown::default()
        })
    }

    #[tokio::test]
    async fn test_create_and_get_baseline() {
        let manager = manager();
        let experiment = Uuid::new_v4();
        let calls = vec![call(experiment, 1000, 0.4, 200), call(experiment, 500, 0.2, 100)];

        let baseline = manager
            .create_baseline(experiment, "control", &calls, Utc::now())
            .await
            .unwrap();

        assert_eq!(baseline.sample_size, 2);
        assert!((baseline.avg_cost - 0.3).abs() < 1e-9);
        assert!((baseline.avg_tokens - 750.0).abs() < 1e-9);

        let fetched = manager.get_baseline(experiment, "control").await.unwrap();
        assert_eq!(fetched, Some(baseline));
        assert!(manager.get_baseline(experiment, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_scenario_replaces_baseline() {
        let manager = manager();
        let experiment = Uuid::new_v4();

        manager
            .create_baseline(experiment, "control", &[call(experiment, 100, 0.1, 10)], Utc::now())
            .await
            .unwrap();
        manager
            .create_baseline(experiment, "control", &[call(experiment, 200, 0.2, 20)], Utc::now())
            .await
            .unwrap();
        manager
            .create_baseline(experiment, "cached", &[call(experiment, 50, 0.05, 5)], Utc::now())
            .await
            .unwrap();

        let baselines = manager.list_baselines(experiment).await.unwrap();
        assert_eq!(baselines.len(), 2);

        let control = manager.get_baseline(experiment, "control").await.unwrap().unwrap();
        assert!((control.avg_cost - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let manager = manager();
        let experiment = Uuid::new_v4();

        let empty = manager
            .create_baseline(experiment, "control", &[], Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(empty, LabError::Validation { .. }));

        let bad_name = manager
            .create_baseline(experiment, "bad/name", &[call(experiment, 1, 0.1, 1)], Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(bad_name, LabError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_compare_against_baseline() {
        let manager = manager();
        let experiment = Uuid::new_v4();

        manager
            .create_baseline(experiment, "control", &[call(experiment, 1000, 0.4, 200)], Utc::now())
            .await
            .unwrap();

        let comparison = manager
            .compare(experiment, "control", &[call(experiment, 500, 0.1, 300)])
            .await
            .unwrap();

        assert!((comparison.cost_change_percent - -75.0).abs() < 1e-9);
        assert!((comparison.token_change_percent - -50.0).abs() < 1e-9);
        assert!((comparison.latency_change_percent - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_compare_missing_baseline_and_empty_calls() {
        let manager = manager();
        let experiment = Uuid::new_v4();

        let missing = manager
            .compare(experiment, "control", &[call(experiment, 1, 0.1, 1)])
            .await
            .unwrap_err();
        assert!(matches!(missing, LabError::BaselineNotFound { .. }));

        let empty = manager.compare(experiment, "control", &[]).await.unwrap_err();
        assert!(matches!(empty, LabError::Validation { .. }));
    }
}
