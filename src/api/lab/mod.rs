//! Lab API endpoints: sessions, experiments, optimization and pricing

pub mod baselines;
pub mod experiments;
pub mod keys;
pub mod optimization;
pub mod sessions;
pub mod simulation;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

/// Create the lab router, nested under `/lab`
pub fn create_lab_router() -> Router<AppState> {
    Router::new()
        // Sandbox sessions
        .route("/sessions", post(sessions::create_session))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/purge", post(sessions::purge_sessions))
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route("/sessions/{session_id}", delete(sessions::terminate_session))
        .route(
            "/sessions/{session_id}/metrics",
            get(sessions::get_session_metrics),
        )
        .route("/sessions/{session_id}/calls", post(sessions::execute_call))
        // Experiment reporting
        .route(
            "/experiments/{experiment_id}/summary",
            get(experiments::get_summary),
        )
        .route(
            "/experiments/{experiment_id}/calls",
            get(experiments::list_calls),
        )
        .route(
            "/experiments/{experiment_id}/analysis",
            get(experiments::analyze_experiment),
        )
        .route(
            "/experiments/{experiment_id}/baselines",
            get(experiments::list_baselines),
        )
        .route(
            "/experiments/{experiment_id}/baselines/{scenario_name}",
            get(experiments::get_baseline),
        )
        // Optimization
        .route("/analyze", post(optimization::analyze))
        .route("/suggestions", post(optimization::suggest))
        .route("/strategies", get(optimization::list_strategies))
        .route("/strategies/rank", post(optimization::rank_strategies))
        .route("/strategies/{name}/apply", post(optimization::apply_strategy))
        // Baselines
        .route("/baselines", post(baselines::create_baseline))
        .route("/baselines/compare", post(baselines::compare_baseline))
        // Simulation and pricing
        .route("/simulate", post(simulation::simulate))
        .route("/pricing", get(simulation::list_rates))
        .route("/pricing/calculate", post(simulation::calculate_price))
        // Provider keys
        .route("/keys", post(keys::store_key))
        .route("/keys", get(keys::list_keys))
        .route("/keys/{key_id}", delete(keys::revoke_key))
}
