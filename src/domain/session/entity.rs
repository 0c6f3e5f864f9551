//! Experiment session entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ResourceLimits, SessionConfig, SessionMetrics, SessionSnapshot};
use crate::domain::error::ResourceLimitReason;
use crate::domain::pricing::{TokenBreakdown, round_cost};
use crate::domain::provider::GeneratedResponse;
use crate::domain::LabError;

/// Opaque session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Running totals of the calls a session has accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub calls: u64,
    pub tokens: TokenBreakdown,
    pub cost: f64,
    pub latency_ms: u64,
}

/// A bounded-lifetime sandbox for one user's simulated API usage
///
/// The session is `active` until [`terminate`](Self::terminate) is called.
/// Expiry is derived from the clock and never stored: an expired session stays
/// physically active until the manager sweeps it.
#[derive(Debug, Clone)]
pub struct ExperimentSession {
    id: SessionId,
    user_id: String,
    experiment_id: Option<Uuid>,
    config: SessionConfig,
    limits: ResourceLimits,
    grace_period_ms: u64,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    totals: SessionTotals,
    resource_limit_breached: bool,
    terminated: bool,
}

impl ExperimentSession {
    pub fn new(
        id: impl Into<SessionId>,
        user_id: impl Into<String>,
        experiment_id: Option<Uuid>,
        config: SessionConfig,
        limits: ResourceLimits,
        grace_period_ms: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            experiment_id,
            config,
            limits,
            grace_period_ms,
            created_at: now,
            last_activity_at: now,
            totals: SessionTotals::default(),
            resource_limit_breached: false,
            terminated: false,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn experiment_id(&self) -> Option<Uuid> {
        self.experiment_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn totals(&self) -> &SessionTotals {
        &self.totals
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn resource_limit_breached(&self) -> bool {
        self.resource_limit_breached
    }

    /// Nominal end of the session, grace period excluded
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::milliseconds(self.limits.max_session_duration_ms as i64)
    }

    /// True once the session outlived its duration plus the grace period
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.created_at).num_milliseconds();
        let allowed_ms = self
            .limits
            .max_session_duration_ms
            .saturating_add(self.grace_period_ms);

        age_ms > allowed_ms.min(i64::MAX as u64) as i64
    }

    /// Reject work on a terminated or expired session
    pub fn ensure_active(&mut self, now: DateTime<Utc>) -> Result<(), LabError> {
        if self.terminated {
            return Err(LabError::resource_limit(
                self.id.as_str(),
                ResourceLimitReason::Terminated,
                "Session has been terminated",
            ));
        }

        if self.is_expired(now) {
            self.resource_limit_breached = true;
            return Err(LabError::resource_limit(
                self.id.as_str(),
                ResourceLimitReason::Expired,
                "Session has expired",
            ));
        }

        Ok(())
    }

    /// Reject a call that would exceed the call or token quota
    pub fn ensure_capacity(&mut self, next_tokens: u64) -> Result<(), LabError> {
        if self.totals.calls >= self.limits.max_calls_per_session {
            self.resource_limit_breached = true;
            return Err(LabError::quota_exceeded(
                self.id.as_str(),
                ResourceLimitReason::CallLimit,
                self.limits.max_calls_per_session,
                self.totals.calls,
            ));
        }

        let projected = self.totals.tokens.total().saturating_add(next_tokens);

        if projected > self.limits.max_tokens_per_session {
            self.resource_limit_breached = true;
            return Err(LabError::quota_exceeded(
                self.id.as_str(),
                ResourceLimitReason::TokenLimit,
                self.limits.max_tokens_per_session,
                projected,
            ));
        }

        Ok(())
    }

    /// Add one call's usage to the session totals.
    ///
    /// Capacity is checked before anything is touched, so a rejected call
    /// leaves the totals unchanged.
    pub fn track_response(&mut self, response: &GeneratedResponse) -> Result<(), LabError> {
        if self.terminated {
            return Err(LabError::resource_limit(
                self.id.as_str(),
                ResourceLimitReason::Terminated,
                "Session has been terminated",
            ));
        }

        self.ensure_capacity(response.tokens.total())?;

        self.totals.calls += 1;
        self.totals.cost += response.cost.total;
        self.totals.latency_ms = self.totals.latency_ms.saturating_add(response.latency_ms);
        self.totals.tokens.add(&response.tokens);

        // response time, not wall clock
        if response.timestamp > self.last_activity_at {
            self.last_activity_at = response.timestamp;
        }

        Ok(())
    }

    /// Mark the session terminated; repeated calls are no-ops
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn to_metrics(&self) -> SessionMetrics {
        let average_latency_ms = if self.totals.calls == 0 {
            0
        } else {
            (self.totals.latency_ms as f64 / self.totals.calls as f64).round() as u64
        };

        let total_tokens = self.totals.tokens.total();

        SessionMetrics {
            session_id: self.id.to_string(),
            total_calls: self.totals.calls,
            tokens: self.totals.tokens,
            total_tokens,
            total_cost: round_cost(self.totals.cost),
            average_latency_ms,
            remaining_calls: self
                .limits
                .max_calls_per_session
                .saturating_sub(self.totals.calls),
            remaining_tokens: self.limits.max_tokens_per_session.saturating_sub(total_tokens),
            resource_limit_breached: self.resource_limit_breached,
        }
    }

    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.to_string(),
            user_id: self.user_id.clone(),
            experiment_id: self.experiment_id,
            config: self.config.clone(),
            limits: self.limits,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
            expires_at: self.expires_at(),
            terminated: self.terminated,
            resource_limit_breached: self.resource_limit_breached,
            metrics: self.to_metrics(),
        }
    }
}
