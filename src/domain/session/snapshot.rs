use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ResourceLimits, SessionConfig};
use crate::domain::pricing::TokenBreakdown;

/// Usage projection of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub session_id: String,
    pub total_calls: u64,
    pub tokens: TokenBreakdown,
    pub total_tokens: u64,
    /// Rounded to 6 decimal places
    pub total_cost: f64,
    pub average_latency_ms: u64,
    pub remaining_calls: u64,
    pub remaining_tokens: u64,
    pub resource_limit_breached: bool,
}

/// Immutable copy of a session handed out to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub user_id: String,
    pub experiment_id: Option<Uuid>,
    pub config: SessionConfig,
    pub limits: ResourceLimits,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub terminated: bool,
    pub resource_limit_breached: bool,
    pub metrics: SessionMetrics,
}
