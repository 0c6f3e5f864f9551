//! Baseline capture and comparison endpoints

use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use uuid::Uuid;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, BaselineRequest, CallSample, CompareBaselineRequest, Json, samples_into_records,
};
use crate::domain::baseline::{Baseline, BaselineComparison};
use crate::domain::call::ApiCallRecord;

/// Inline samples, or every call tracked for the experiment
async fn resolve_calls(
    state: &AppState,
    experiment_id: Uuid,
    samples: Option<Vec<CallSample>>,
) -> Result<Vec<ApiCallRecord>, ApiError> {
    match samples {
        Some(samples) => Ok(samples_into_records(samples, experiment_id, &state.pricing)?),
        None => Ok(state.tracker.list_calls(experiment_id, None).await?),
    }
}

/// POST /lab/baselines
pub async fn create_baseline(
    State(state): State<AppState>,
    Json(request): Json<BaselineRequest>,
) -> Result<(StatusCode, Json<Baseline>), ApiError> {
    let calls = resolve_calls(&state, request.experiment_id, request.calls).await?;

    let baseline = state
        .baselines
        .create_baseline(
            request.experiment_id,
            &request.scenario_name,
            &calls,
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(baseline)))
}

/// POST /lab/baselines/compare
pub async fn compare_baseline(
    State(state): State<AppState>,
    Json(request): Json<CompareBaselineRequest>,
) -> Result<Json<BaselineComparison>, ApiError> {
    let calls = resolve_calls(&state, request.experiment_id, request.calls).await?;

    let comparison = state
        .baselines
        .compare(request.experiment_id, &request.scenario_name, &calls)
        .await?;

    Ok(Json(comparison))
}
