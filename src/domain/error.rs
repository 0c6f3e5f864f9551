use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Why a session refused to accept more work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceLimitReason {
    Terminated,
    Expired,
    CallLimit,
    TokenLimit,
}

impl std::fmt::Display for ResourceLimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Terminated => write!(f, "terminated"),
            Self::Expired => write!(f, "expired"),
            Self::CallLimit => write!(f, "call_limit"),
            Self::TokenLimit => write!(f, "token_limit"),
        }
    }
}

/// Discriminant of a [`LabError`], stable across the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabErrorKind {
    SessionNotFound,
    ResourceLimit,
    ProviderUnavailable,
    ProviderExecution,
    ApiKey,
    Validation,
    BaselineNotFound,
    Storage,
    Internal,
}

impl std::fmt::Display for LabErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        write!(f, "{}", value.as_str().unwrap_or("internal"))
    }
}

/// Core lab errors
#[derive(Debug, Error)]
pub enum LabError {
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Resource limit reached for session {session_id}: {message}")]
    ResourceLimit {
        session_id: String,
        reason: ResourceLimitReason,
        message: String,
        limit: Option<u64>,
        current: Option<u64>,
    },

    #[error("Provider unavailable: {provider} - {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("Provider execution failed: {provider} - {message}")]
    ProviderExecution { provider: String, message: String },

    #[error("API key error: {message}")]
    ApiKey { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Baseline not found: {experiment_id}/{scenario_name}")]
    BaselineNotFound {
        experiment_id: String,
        scenario_name: String,
    },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LabError {
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    pub fn resource_limit(
        session_id: impl Into<String>,
        reason: ResourceLimitReason,
        message: impl Into<String>,
    ) -> Self {
        Self::ResourceLimit {
            session_id: session_id.into(),
            reason,
            message: message.into(),
            limit: None,
            current: None,
        }
    }

    /// Quota rejection carrying the configured ceiling and the observed value
    pub fn quota_exceeded(
        session_id: impl Into<String>,
        reason: ResourceLimitReason,
        limit: u64,
        current: u64,
    ) -> Self {
        Self::ResourceLimit {
            session_id: session_id.into(),
            reason,
            message: format!("{} exceeded ({} of {})", reason, current, limit),
            limit: Some(limit),
            current: Some(current),
        }
    }

    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn provider_execution(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderExecution {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn api_key(message: impl Into<String>) -> Self {
        Self::ApiKey {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn baseline_not_found(
        experiment_id: impl Into<String>,
        scenario_name: impl Into<String>,
    ) -> Self {
        Self::BaselineNotFound {
            experiment_id: experiment_id.into(),
            scenario_name: scenario_name.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> LabErrorKind {
        match self {
            Self::SessionNotFound { .. } => LabErrorKind::SessionNotFound,
            Self::ResourceLimit { .. } => LabErrorKind::ResourceLimit,
            Self::ProviderUnavailable { .. } => LabErrorKind::ProviderUnavailable,
            Self::ProviderExecution { .. } => LabErrorKind::ProviderExecution,
            Self::ApiKey { .. } => LabErrorKind::ApiKey,
            Self::Validation { .. } => LabErrorKind::Validation,
            Self::BaselineNotFound { .. } => LabErrorKind::BaselineNotFound,
            Self::Storage { .. } => LabErrorKind::Storage,
            Self::Internal { .. } => LabErrorKind::Internal,
        }
    }

    /// Structured payload describing the failure
    pub fn details(&self) -> Value {
        match self {
            Self::SessionNotFound { session_id } => json!({ "session_id": session_id }),
            Self::ResourceLimit {
                session_id,
                reason,
                limit,
                current,
                ..
            } => json!({
                "session_id": session_id,
                "reason": reason,
                "limit": limit,
                "current": current,
            }),
            Self::ProviderUnavailable { provider, .. }
            | Self::ProviderExecution { provider, .. } => json!({ "provider": provider }),
            Self::BaselineNotFound {
                experiment_id,
                scenario_name,
            } => json!({
                "experiment_id": experiment_id,
                "scenario_name": scenario_name,
            }),
            Self::ApiKey { .. }
            | Self::Validation { .. }
            | Self::Storage { .. }
            | Self::Internal { .. } => json!({}),
        }
    }

    /// True when the session refused the work because of its quota or lifetime
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Self::ResourceLimit { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_error() {
        let error = LabError::session_not_found("sess_abc");
        assert_eq!(error.to_string(), "Session not found: sess_abc");
        assert_eq!(error.kind(), LabErrorKind::SessionNotFound);
        assert_eq!(error.details()["session_id"], "sess_abc");
    }

    #[test]
    fn test_quota_exceeded_details() {
        let error = LabError::quota_exceeded("sess_1", ResourceLimitReason::TokenLimit, 100, 120);

        assert!(error.is_resource_limit());
        assert_eq!(error.kind(), LabErrorKind::ResourceLimit);

        let details = error.details();
        assert_eq!(details["reason"], "token_limit");
        assert_eq!(details["limit"], 100);
        assert_eq!(details["current"], 120);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(LabErrorKind::ProviderUnavailable.to_string(), "provider_unavailable");
        assert_eq!(LabErrorKind::ApiKey.to_string(), "api_key");
    }

    #[test]
    fn test_validation_error() {
        let error = LabError::validation("Invalid input");
        assert_eq!(error.to_string(), "Validation error: Invalid input");
        assert_eq!(error.details(), json!({}));
    }
}
