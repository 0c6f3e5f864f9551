//! Caller identity taken from the `x-user-id` header
//!
//! The lab trusts an upstream proxy to authenticate users; it only scopes
//! sessions and stored keys by the id it is given.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::types::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

const MAX_USER_ID_LEN: usize = 128;

/// Extractor that requires a non-empty user id header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireUser(pub String);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_user_id(&parts.headers).map(RequireUser)
    }
}

pub fn extract_user_id(headers: &axum::http::HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| {
            ApiError::unauthorized(format!("Missing '{}' header", USER_ID_HEADER))
        })?
        .to_str()
        .map_err(|_| ApiError::bad_request(format!("Invalid '{}' header encoding", USER_ID_HEADER)))?
        .trim();

    if value.is_empty() {
        return Err(ApiError::unauthorized(format!("Empty '{}' header", USER_ID_HEADER)));
    }

    if value.len() > MAX_USER_ID_LEN {
        return Err(ApiError::bad_request(format!(
            "'{}' header exceeds {} characters",
            USER_ID_HEADER, MAX_USER_ID_LEN
        )));
    }

    Ok(value.to_string())
}
