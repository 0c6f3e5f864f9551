//! Provider key endpoints; keys are scoped to the calling user

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, StoreKeyRequest};
use crate::domain::api_key::{ApiKeyId, StoredApiKey};

#[derive(Debug, Clone, Serialize)]
pub struct ListKeysResponse {
    pub keys: Vec<StoredApiKey>,
    pub total: usize,
}

/// POST /lab/keys
pub async fn store_key(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Json(request): Json<StoreKeyRequest>,
) -> Result<(StatusCode, Json<StoredApiKey>), ApiError> {
    debug!(user_id = %user_id, provider = %request.provider, "Storing provider key");

    let key = state
        .vault
        .store(
            &user_id,
            request.provider,
            &request.secret,
            request.label.as_deref(),
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(key)))
}

/// GET /lab/keys
pub async fn list_keys(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<Json<ListKeysResponse>, ApiError> {
    let keys = state.vault.list(&user_id).await?;
    let total = keys.len();

    Ok(Json(ListKeysResponse { keys, total }))
}

/// DELETE /lab/keys/{key_id}
pub async fn revoke_key(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(key_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .vault
        .revoke(&user_id, &ApiKeyId::new(key_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
