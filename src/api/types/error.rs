//! API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{LabError, LabErrorKind};

/// Error categories reported in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    AuthenticationError,
    PermissionError,
    NotFoundError,
    RateLimitError,
    UpstreamError,
    ServerError,
    ServiceUnavailableError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::AuthenticationError => write!(f, "authentication_error"),
            Self::PermissionError => write!(f, "permission_error"),
            Self::NotFoundError => write!(f, "not_found_error"),
            Self::RateLimitError => write!(f, "rate_limit_error"),
            Self::UpstreamError => write!(f, "upstream_error"),
            Self::ServerError => write!(f, "server_error"),
            Self::ServiceUnavailableError => write!(f, "service_unavailable_error"),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    code: None,
                    details: None,
                },
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.response.error.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ApiErrorType::AuthenticationError, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ApiErrorType::PermissionError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiErrorType::NotFoundError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, ApiErrorType::RateLimitError, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, ApiErrorType::UpstreamError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorType::ServerError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorType::ServiceUnavailableError,
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<LabError> for ApiError {
    fn from(err: LabError) -> Self {
        let kind = err.kind();
        let message = err.to_string();

        let api_error = match kind {
            LabErrorKind::SessionNotFound | LabErrorKind::BaselineNotFound => {
                Self::not_found(message)
            }
            LabErrorKind::ResourceLimit => Self::rate_limited(message),
            LabErrorKind::ProviderUnavailable => Self::unavailable(message),
            LabErrorKind::ProviderExecution => Self::bad_gateway(message),
            LabErrorKind::ApiKey => Self::forbidden(message),
            LabErrorKind::Validation => Self::bad_request(message),
            LabErrorKind::Storage | LabErrorKind::Internal => {
                tracing::error!(error = %message, "Request failed");
                Self::internal(message)
            }
        };

        let details = err.details();
        let api_error = api_error.with_code(kind.to_string());

        if details.as_object().is_some_and(|d| !d.is_empty()) {
            api_error.with_details(details)
        } else {
            api_error
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceLimitReason;

    #[test]
    fn test_lab_error_status_mapping() {
        let cases = [
            (LabError::session_not_found("sess_1"), StatusCode::NOT_FOUND),
            (LabError::baseline_not_found("exp", "scn"), StatusCode::NOT_FOUND),
            (
                LabError::resource_limit("sess_1", ResourceLimitReason::Expired, "expired"),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                LabError::provider_unavailable("openai", "down"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (LabError::provider_execution("openai", "boom"), StatusCode::BAD_GATEWAY),
            (LabError::api_key("missing"), StatusCode::FORBIDDEN),
            (LabError::validation("bad"), StatusCode::BAD_REQUEST),
            (LabError::storage("db"), StatusCode::INTERNAL_SERVER_ERROR),
            (LabError::internal("oops"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_resource_limit_carries_details() {
        let err = ApiError::from(LabError::quota_exceeded(
            "sess_1",
            ResourceLimitReason::CallLimit,
            10,
            10,
        ));

        assert_eq!(err.response.error.code.as_deref(), Some("resource_limit"));
        let details = err.response.error.details.unwrap();
        assert_eq!(details["reason"], "call_limit");
        assert_eq!(details["limit"], 10);
    }

    #[test]
    fn test_empty_details_are_omitted() {
        let err = ApiError::from(LabError::validation("Invalid input"));
        let json = serde_json::to_string(&err.response).unwrap();

        assert!(json.contains("invalid_request_error"));
        assert!(json.contains("\"code\":\"validation\""));
        assert!(!json.contains("details"));
    }
}
