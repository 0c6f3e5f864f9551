//! Baseline entity and comparison

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::call::ApiCallRecord;
use crate::domain::pricing::{round_cost, round_to};

static SCENARIO_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_\- ]+$").expect("scenario name pattern is valid")
});

const MAX_SCENARIO_NAME_LEN: usize = 64;

/// Baseline validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineValidationError {
    EmptyScenarioName,
    ScenarioNameTooLong(usize),
    InvalidScenarioName,
    NoCalls,
}

impl std::fmt::Display for BaselineValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyScenarioName => write!(f, "Scenario name cannot be empty"),
            Self::ScenarioNameTooLong(len) => write!(
                f,
                "Scenario name too long: {} chars (max {})",
                len, MAX_SCENARIO_NAME_LEN
            ),
            Self::InvalidScenarioName => write!(
                f,
                "Scenario name must contain only letters, digits, spaces, hyphens and underscores"
            ),
            Self::NoCalls => write!(f, "At least one call is required"),
        }
    }
}

impl std::error::Error for BaselineValidationError {}

/// Validate a baseline scenario name
pub fn validate_scenario_name(name: &str) -> Result<(), BaselineValidationError> {
    if name.trim().is_empty() {
        return Err(BaselineValidationError::EmptyScenarioName);
    }

    if name.len() > MAX_SCENARIO_NAME_LEN {
        return Err(BaselineValidationError::ScenarioNameTooLong(name.len()));
    }

    if !SCENARIO_NAME.is_match(name) {
        return Err(BaselineValidationError::InvalidScenarioName);
    }

    Ok(())
}

/// Per-call averages over a batch of calls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallAverages {
    pub avg_cost: f64,
    pub avg_tokens: f64,
    pub avg_latency_ms: f64,
    pub sample_size: u64,
}

impl CallAverages {
    pub fn from_calls(calls: &[ApiCallRecord]) -> Result<Self, BaselineValidationError> {
        if calls.is_empty() {
            return Err(BaselineValidationError::NoCalls);
        }

        let n = calls.len() as f64;
        let cost: f64 = calls.iter().map(|c| c.cost).sum();
        let tokens = calls
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.total_tokens()));
        let latency = calls
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.latency_ms));

        Ok(Self {
            avg_cost: round_cost(cost / n),
            avg_tokens: round_to(tokens as f64 / n, 2),
            avg_latency_ms: round_to(latency as f64 / n, 2),
            sample_size: calls.len() as u64,
        })
    }
}

/// Reference aggregate for one experiment scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub scenario_name: String,
    pub avg_cost: f64,
    pub avg_tokens: f64,
    pub avg_latency_ms: f64,
    pub sample_size: u64,
    pub created_at: DateTime<Utc>,
}

impl Baseline {
    /// Aggregate a batch of calls into a new baseline
    pub fn from_calls(
        experiment_id: Uuid,
        scenario_name: &str,
        calls: &[ApiCallRecord],
        now: DateTime<Utc>,
    ) -> Result<Self, BaselineValidationError> {
        validate_scenario_name(scenario_name)?;
        let averages = CallAverages::from_calls(calls)?;

        Ok(Self {
            id: Uuid::new_v4(),
            experiment_id,
            scenario_name: scenario_name.to_string(),
            avg_cost: averages.avg_cost,
            avg_tokens: averages.avg_tokens,
            avg_latency_ms: averages.avg_latency_ms,
            sample_size: averages.sample_size,
            created_at: now,
        })
    }

    /// Compare a batch of later calls against this baseline
    pub fn compare(&self, current: CallAverages) -> BaselineComparison {
        BaselineComparison {
            baseline: self.clone(),
            current,
            cost_change_percent: percent_change(self.avg_cost, current.avg_cost),
            token_change_percent: percent_change(self.avg_tokens, current.avg_tokens),
            latency_change_percent: percent_change(self.avg_latency_ms, current.avg_latency_ms),
        }
    }
}

/// Relative change of current averages versus a baseline (negative is a saving)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub baseline: Baseline,
    pub current: CallAverages,
    pub cost_change_percent: f64,
    pub token_change_percent: f64,
    pub latency_change_percent: f64,
}

fn percent_change(reference: f64, current: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }

    round_to((current - reference) / reference * 100.0, 2)
}
