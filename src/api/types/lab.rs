//! Lab request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::analysis::TokenAnalysis;
use crate::domain::call::ApiCallRecord;
use crate::domain::pricing::{PricingTable, TokenBreakdown};
use crate::domain::provider::ProviderKind;
use crate::domain::session::SessionConfig;
use crate::domain::strategy::{
    OptimizationStrategy, OptimizationSuggestion, StrategyCategory, StrategyContext,
};
use crate::domain::LabError;

/// POST /lab/sessions
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub experiment_id: Option<Uuid>,
    pub config: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub purged: usize,
    pub active: usize,
}

/// A call described by hand, for analysis and baselines outside a session.
///
/// Cost is computed from the rate table when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct CallSample {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub tokens: TokenBreakdown,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CallSample {
    pub fn into_record(
        self,
        experiment_id: Uuid,
        pricing: &PricingTable,
    ) -> Result<ApiCallRecord, LabError> {
        let cost = match self.cost {
            Some(cost) if cost.is_finite() && cost >= 0.0 => cost,
            Some(cost) => {
                return Err(LabError::validation(format!(
                    "Cost must be a non-negative number, got {}",
                    cost
                )));
            }
            None => {
                pricing
                    .calculate_cost(self.provider, &self.model, &self.tokens)?
                    .total
            }
        };

        Ok(ApiCallRecord {
            id: Uuid::new_v4(),
            experiment_id,
            session_id: String::new(),
            provider: self.provider,
            model: self.model,
            tokens: self.tokens,
            cost,
            latency_ms: self.latency_ms,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

/// Convert samples into records attributed to one experiment
pub fn samples_into_records(
    samples: Vec<CallSample>,
    experiment_id: Uuid,
    pricing: &PricingTable,
) -> Result<Vec<ApiCallRecord>, LabError> {
    samples
        .into_iter()
        .map(|sample| sample.into_record(experiment_id, pricing))
        .collect()
}

/// POST /lab/analyze
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub calls: Vec<CallSample>,
}

/// POST /lab/suggestions
///
/// Calls come from a tracked experiment or are given inline. The strategy
/// context defaults to the most used model of those calls.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionsRequest {
    #[serde(default)]
    pub experiment_id: Option<Uuid>,
    #[serde(default)]
    pub calls: Vec<CallSample>,
    #[serde(default)]
    pub context: Option<StrategyContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionsResponse {
    pub analysis: TokenAnalysis,
    pub suggestions: Vec<OptimizationSuggestion>,
}

/// Representative context for a batch of calls.
///
/// Uses the most frequent provider/model pair, average tokens per call and
/// the batch size as daily volume.
pub fn context_from_records(records: &[ApiCallRecord]) -> Option<StrategyContext> {
    let mut counts: Vec<((ProviderKind, &str), usize)> = Vec::new();
    for record in records {
        let key = (record.provider, record.model.as_str());
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => counts.push((key, 1)),
        }
    }

    // first seen wins ties
    let mut best: Option<((ProviderKind, &str), usize)> = None;
    for &(key, count) in &counts {
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((key, count)),
        }
    }
    let ((provider, model), _) = best?;

    let n = records.len() as u64;
    let mut totals = TokenBreakdown::default();
    for record in records {
        totals.add(&record.tokens);
    }

    let average = TokenBreakdown::new(totals.input / n, totals.output / n, totals.system / n);

    Some(StrategyContext::new(provider, model, average).with_volume(n, 1))
}

/// Strategy listing entry for GET /lab/strategies
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub name: &'static str,
    pub category: StrategyCategory,
    pub description: &'static str,
    pub settings: OptimizationStrategy,
}

impl From<&OptimizationStrategy> for StrategyInfo {
    fn from(strategy: &OptimizationStrategy) -> Self {
        Self {
            name: strategy.name(),
            category: strategy.category(),
            description: strategy.description(),
            settings: strategy.clone(),
        }
    }
}

/// POST /lab/baselines
///
/// Without inline calls the experiment's tracked calls are used.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineRequest {
    pub experiment_id: Uuid,
    pub scenario_name: String,
    #[serde(default)]
    pub calls: Option<Vec<CallSample>>,
}

/// POST /lab/baselines/compare
#[derive(Debug, Clone, Deserialize)]
pub struct CompareBaselineRequest {
    pub experiment_id: Uuid,
    pub scenario_name: String,
    #[serde(default)]
    pub calls: Option<Vec<CallSample>>,
}

/// POST /lab/pricing/calculate
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRequest {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub tokens: TokenBreakdown,
}

/// POST /lab/keys
#[derive(Debug, Clone, Deserialize)]
pub struct StoreKeyRequest {
    pub provider: ProviderKind,
    pub secret: String,
    #[serde(default)]
    pub label: Option<String>,
}
