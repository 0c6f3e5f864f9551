//! Token analysis, suggestions and strategy endpoints

use axum::extract::{Path, State};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{
    AnalyzeRequest, ApiError, Json, StrategyInfo, SuggestionsRequest, SuggestionsResponse,
    context_from_records, samples_into_records,
};
use crate::domain::analysis::TokenAnalysis;
use crate::domain::strategy::{StrategyContext, StrategyRanking, StrategyResult};
use uuid::Uuid;

/// POST /lab/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<TokenAnalysis>, ApiError> {
    let calls = samples_into_records(request.calls, Uuid::nil(), &state.pricing)?;

    Ok(Json(state.analyzer.analyze(&calls)))
}

/// POST /lab/suggestions
///
/// Inline calls take precedence over the experiment's tracked calls.
pub async fn suggest(
    State(state): State<AppState>,
    Json(request): Json<SuggestionsRequest>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let experiment_id = request.experiment_id.unwrap_or_else(Uuid::nil);

    let calls = match request.experiment_id {
        Some(experiment_id) if request.calls.is_empty() => {
            state.tracker.list_calls(experiment_id, None).await?
        }
        _ => samples_into_records(request.calls, experiment_id, &state.pricing)?,
    };

    let analysis = state.analyzer.analyze(&calls);
    let suggestions = match request.context.or_else(|| context_from_records(&calls)) {
        Some(ctx) => state.suggester.suggest(&analysis, &ctx),
        None => Vec::new(),
    };

    debug!(
        calls = calls.len(),
        suggestions = suggestions.len(),
        "Generated optimization suggestions"
    );

    Ok(Json(SuggestionsResponse {
        analysis,
        suggestions,
    }))
}

/// GET /lab/strategies
pub async fn list_strategies(State(state): State<AppState>) -> Json<Vec<StrategyInfo>> {
    Json(
        state
            .strategies()
            .get_all()
            .iter()
            .map(StrategyInfo::from)
            .collect(),
    )
}

/// POST /lab/strategies/rank
pub async fn rank_strategies(
    State(state): State<AppState>,
    Json(ctx): Json<StrategyContext>,
) -> Json<Vec<StrategyRanking>> {
    Json(state.strategies().rank_strategies(&ctx))
}

/// POST /lab/strategies/{name}/apply
pub async fn apply_strategy(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(ctx): Json<StrategyContext>,
) -> Result<Json<StrategyResult>, ApiError> {
    let strategy = state
        .strategies()
        .get(&name)
        .ok_or_else(|| ApiError::not_found(format!("Strategy '{}' not found", name)))?;

    Ok(Json(strategy.apply(&ctx)))
}
