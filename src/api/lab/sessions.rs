//! Sandbox session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, CreateSessionRequest, Json, PurgeResponse};
use crate::domain::session::{SessionMetrics, SessionSnapshot};
use crate::domain::LabError;
use crate::infrastructure::services::{LabCallOutcome, LabCallRequest};

#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionSnapshot>,
    pub total: usize,
}

/// Sessions of other users are reported as missing
async fn owned_session(
    state: &AppState,
    user_id: &str,
    session_id: &str,
) -> Result<SessionSnapshot, ApiError> {
    let snapshot = state.lab.get_session(session_id).await?;

    if snapshot.user_id != user_id {
        debug!(session_id, user_id, "Session belongs to another user");
        return Err(LabError::session_not_found(session_id).into());
    }

    Ok(snapshot)
}

/// POST /lab/sessions
pub async fn create_session(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    debug!(user_id = %user_id, provider = %request.config.provider, "Creating session");

    let snapshot = state
        .lab
        .create_session(&user_id, request.experiment_id, request.config, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /lab/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Json<ListSessionsResponse> {
    let sessions = state.lab.list_user_sessions(&user_id).await;
    let total = sessions.len();

    Json(ListSessionsResponse { sessions, total })
}

/// GET /lab/sessions/{session_id}
///
/// Answers like the metrics endpoint: an expired session is a resource limit
/// error even before the sweeper removes it.
pub async fn get_session(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    owned_session(&state, &user_id, &session_id).await?;

    let snapshot = state.lab.get_live_session(&session_id, Utc::now()).await?;
    Ok(Json(snapshot))
}

/// GET /lab/sessions/{session_id}/metrics
pub async fn get_session_metrics(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionMetrics>, ApiError> {
    owned_session(&state, &user_id, &session_id).await?;

    let metrics = state
        .lab
        .get_session_metrics(&session_id, Utc::now())
        .await?;

    Ok(Json(metrics))
}

/// DELETE /lab/sessions/{session_id}
pub async fn terminate_session(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    owned_session(&state, &user_id, &session_id).await?;

    debug!(session_id = %session_id, "Terminating session");
    let snapshot = state.lab.terminate_session(&session_id).await?;

    Ok(Json(snapshot))
}

/// POST /lab/sessions/{session_id}/calls
pub async fn execute_call(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(session_id): Path<String>,
    Json(request): Json<LabCallRequest>,
) -> Result<Json<LabCallOutcome>, ApiError> {
    owned_session(&state, &user_id, &session_id).await?;

    let outcome = state
        .lab
        .execute_call(&session_id, request, Utc::now())
        .await?;

    Ok(Json(outcome))
}

/// POST /lab/sessions/purge
pub async fn purge_sessions(State(state): State<AppState>) -> Json<PurgeResponse> {
    let purged = state.lab.purge_expired_sessions(Utc::now()).await;
    let active = state.lab.active_sessions().await;

    Json(PurgeResponse { purged, active })
}
