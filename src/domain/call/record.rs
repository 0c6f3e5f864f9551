//! API call records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing::{CostBreakdown, TokenBreakdown, round_cost};
use crate::domain::provider::ProviderKind;

/// One tracked provider call, immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallRecord {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub session_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub tokens: TokenBreakdown,
    pub cost: f64,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ApiCallRecord {
    pub fn total_tokens(&self) -> u64 {
        self.tokens.total()
    }
}

/// Input for recording a call; cost is computed by the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApiCall {
    pub experiment_id: Uuid,
    pub session_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub tokens: TokenBreakdown,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl NewApiCall {
    pub fn new(
        experiment_id: Uuid,
        session_id: impl Into<String>,
        provider: ProviderKind,
        model: impl Into<String>,
        tokens: TokenBreakdown,
    ) -> Self {
        Self {
            experiment_id,
            session_id: session_id.into(),
            provider,
            model: model.into(),
            tokens,
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Build the record to persist
    pub fn into_record(self, cost: &CostBreakdown) -> ApiCallRecord {
        ApiCallRecord {
            id: Uuid::new_v4(),
            experiment_id: self.experiment_id,
            session_id: self.session_id,
            provider: self.provider,
            model: self.model,
            tokens: self.tokens,
            cost: cost.total,
            latency_ms: self.latency_ms,
            timestamp: self.timestamp,
        }
    }
}

/// A persisted record together with its cost breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    #[serde(flatten)]
    pub record: ApiCallRecord,
    pub cost_breakdown: CostBreakdown,
}

/// Aggregate usage of one experiment; every field defaults to zero
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub call_count: u64,
    pub total_cost: f64,
    pub tokens: TokenBreakdown,
    pub total_tokens: u64,
    pub average_latency_ms: f64,
}

impl ExperimentSummary {
    /// Fold a set of records into a summary
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ApiCallRecord>) -> Self {
        let mut summary = Self::default();
        let mut latency_sum = 0u64;

        for record in records {
            summary.call_count += 1;
            summary.total_cost += record.cost;
            summary.tokens.add(&record.tokens);
            latency_sum = latency_sum.saturating_add(record.latency_ms);
        }

        summary.total_cost = round_cost(summary.total_cost);
        summary.total_tokens = summary.tokens.total();

        if summary.call_count > 0 {
            summary.average_latency_ms = latency_sum as f64 / summary.call_count as f64;
        }

        summary
    }
}
