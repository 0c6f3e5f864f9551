//! Cost tracker: prices and persists tracked calls

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::LabError;
use crate::domain::call::{ApiCallRecord, ApiCallRepository, ExperimentSummary, NewApiCall, RecordedCall};
use crate::domain::pricing::{PricingTable, default_pricing_table};

#[derive(Debug, Clone)]
pub struct CostTracker {
    repository: Arc<dyn ApiCallRepository>,
    pricing: PricingTable,
}

impl CostTracker {
    pub fn new(repository: Arc<dyn ApiCallRepository>) -> Self {
        Self::with_pricing(repository, default_pricing_table().clone())
    }

    pub fn with_pricing(repository: Arc<dyn ApiCallRepository>, pricing: PricingTable) -> Self {
        Self {
            repository,
            pricing,
        }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Price a call and persist it
    pub async fn record_call(&self, call: NewApiCall) -> Result<RecordedCall, LabError> {
        let cost_breakdown = self
            .pricing
            .calculate_cost(call.provider, &call.model, &call.tokens)?;

        let record = self
            .repository
            .insert(call.into_record(&cost_breakdown))
            .await?;

        tracing::debug!(
            experiment_id = %record.experiment_id,
            session_id = %record.session_id,
            provider = %record.provider,
            model = %record.model,
            tokens = record.total_tokens(),
            cost = record.cost,
            "Recorded API call"
        );

        Ok(RecordedCall {
            record,
            cost_breakdown,
        })
    }

    pub async fn get_experiment_summary(
        &self,
        experiment_id: Uuid,
    ) -> Result<ExperimentSummary, LabError> {
        self.repository.summarize(experiment_id).await
    }

    /// Calls of an experiment, newest first
    pub async fn list_calls(
        &self,
        experiment_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ApiCallRecord>, LabError> {
        self.repository
            .list_by_experiment(experiment_id, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::TokenBreakdown;
    use crate::domain::provider::ProviderKind;
    use crate::infrastructure::call::InMemoryApiCallRepository;

    fn tracker() -> CostTracker {
        CostTracker::new(Arc::new(InMemoryApiCallRepository::new()))
    }

    #[tokio::test]
    async fn test_record_call_prices_and_persists() {
        let tracker = tracker();
        let experiment = Uuid::new_v4();

        let recorded = tracker
            .record_call(
                NewApiCall::new(
                    experiment,
                    "sess_1",
                    ProviderKind::OpenAi,
                    "gpt-4o-mini",
                    TokenBreakdown::new(750, 250, 100),
                )
                .with_latency_ms(120),
            )
            .await
            .unwrap();

        assert!((recorded.cost_breakdown.prompt - 0.1125).abs() < 1e-9);
        assert!((recorded.record.cost - 0.2775).abs() < 1e-9);

        let summary = tracker.get_experiment_summary(experiment).await.unwrap();
        assert_eq!(summary.call_count, 1);
        assert_eq!(summary.total_tokens, 1100);

        let calls = tracker.list_calls(experiment, None).await.unwrap();
        assert_eq!(calls, vec![recorded.record]);
    }

    #[tokio::test]
    async fn test_record_call_without_model_is_not_persisted() {
        let tracker = tracker();
        let experiment = Uuid::new_v4();

        let err = tracker
            .record_call(NewApiCall::new(
                experiment,
                "sess_1",
                ProviderKind::Anthropic,
                "",
                TokenBreakdown::new(10, 10, 0),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, LabError::ProviderExecution { .. }));
        assert_eq!(
            tracker.get_experiment_summary(experiment).await.unwrap(),
            ExperimentSummary::default()
        );
    }

    #[tokio::test]
    async fn test_summary_of_unknown_experiment_is_zero() {
        let summary = tracker()
            .get_experiment_summary(Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(summary, ExperimentSummary::default());
    }
}
