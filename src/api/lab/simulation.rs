//! Usage simulation and pricing endpoints

use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, PriceRequest};
use crate::domain::pricing::{CostBreakdown, ModelRate, TokenBreakdown};
use crate::domain::provider::ProviderKind;
use crate::domain::simulation::{UsageProfile, UsageProjection};

#[derive(Debug, Clone, Serialize)]
pub struct PriceResponse {
    pub provider: ProviderKind,
    pub model: String,
    pub tokens: TokenBreakdown,
    pub total_tokens: u64,
    pub cost: CostBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderRates {
    pub provider: ProviderKind,
    pub models: Vec<ModelRate>,
}

/// POST /lab/simulate
pub async fn simulate(
    State(state): State<AppState>,
    Json(profile): Json<UsageProfile>,
) -> Result<Json<UsageProjection>, ApiError> {
    Ok(Json(state.simulator.simulate(&profile)?))
}

/// POST /lab/pricing/calculate
pub async fn calculate_price(
    State(state): State<AppState>,
    Json(request): Json<PriceRequest>,
) -> Result<Json<PriceResponse>, ApiError> {
    let cost = state
        .pricing
        .calculate_cost(request.provider, &request.model, &request.tokens)?;

    Ok(Json(PriceResponse {
        provider: request.provider,
        total_tokens: request.tokens.total(),
        model: request.model,
        tokens: request.tokens,
        cost,
    }))
}

/// GET /lab/pricing
pub async fn list_rates(State(state): State<AppState>) -> Json<Vec<ProviderRates>> {
    Json(
        ProviderKind::ALL
            .into_iter()
            .map(|provider| ProviderRates {
                provider,
                models: state.pricing.models(provider).to_vec(),
            })
            .collect(),
    )
}
