//! Experiment reporting endpoints

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::analysis::TokenAnalysis;
use crate::domain::baseline::Baseline;
use crate::domain::call::{ApiCallRecord, ExperimentSummary};
use crate::domain::LabError;

const MAX_CALLS_PAGE: usize = 1000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCallsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListCallsResponse {
    pub calls: Vec<ApiCallRecord>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListBaselinesResponse {
    pub baselines: Vec<Baseline>,
    pub total: usize,
}

/// GET /lab/experiments/{experiment_id}/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> Result<Json<ExperimentSummary>, ApiError> {
    let summary = state.tracker.get_experiment_summary(experiment_id).await?;

    Ok(Json(summary))
}

/// GET /lab/experiments/{experiment_id}/calls
pub async fn list_calls(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
    Query(query): Query<ListCallsQuery>,
) -> Result<Json<ListCallsResponse>, ApiError> {
    let limit = query.limit.map(|limit| limit.clamp(1, MAX_CALLS_PAGE));
    let calls = state.tracker.list_calls(experiment_id, limit).await?;
    let total = calls.len();

    Ok(Json(ListCallsResponse { calls, total }))
}

/// GET /lab/experiments/{experiment_id}/analysis
pub async fn analyze_experiment(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> Result<Json<TokenAnalysis>, ApiError> {
    let calls = state.tracker.list_calls(experiment_id, None).await?;

    Ok(Json(state.analyzer.analyze(&calls)))
}

/// GET /lab/experiments/{experiment_id}/baselines
pub async fn list_baselines(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
) -> Result<Json<ListBaselinesResponse>, ApiError> {
    let baselines = state.baselines.list_baselines(experiment_id).await?;
    let total = baselines.len();

    Ok(Json(ListBaselinesResponse { baselines, total }))
}

/// GET /lab/experiments/{experiment_id}/baselines/{scenario_name}
pub async fn get_baseline(
    State(state): State<AppState>,
    Path((experiment_id, scenario_name)): Path<(Uuid, String)>,
) -> Result<Json<Baseline>, ApiError> {
    let baseline = state
        .baselines
        .get_baseline(experiment_id, &scenario_name)
        .await?
        .ok_or_else(|| LabError::baseline_not_found(experiment_id.to_string(), &scenario_name))?;

    Ok(Json(baseline))
}
