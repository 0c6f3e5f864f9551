//! API Cost Optimization Lab
//!
//! Sandboxed LLM usage experiments with:
//! - Per-user sessions with call, token and duration quotas
//! - Per-call cost tracking and experiment summaries
//! - Token analysis, optimization strategies and usage simulation
//! - Baselines for before/after comparison

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::{AppState, AppStateParts};
use config::StorageBackend;
use domain::pricing::default_pricing_table;
use infrastructure::{
    api_key::{ApiKeyVault, InMemoryApiKeyRepository},
    baseline::{BaselineManager, InMemoryBaselineRepository, SqlBaselineRepository},
    call::{CostTracker, InMemoryApiCallRepository, SqlApiCallRepository},
    gateway::GatewayRegistry,
    storage::{run_lab_migrations, PostgresQueryable},
};
use tracing::{info, warn};

/// Create the application state with the default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let pricing = default_pricing_table().clone();

    info!("Storage backend: {:?}", config.storage.backend);

    let (tracker, baselines) = match config.storage.backend {
        StorageBackend::Memory => (
            CostTracker::with_pricing(Arc::new(InMemoryApiCallRepository::new()), pricing.clone()),
            BaselineManager::new(Arc::new(InMemoryBaselineRepository::new())),
        ),
        StorageBackend::Postgres => {
            let pg_config = config.storage.postgres().ok_or_else(|| {
                anyhow::anyhow!(
                    "storage.database_url or DATABASE_URL is required for the postgres backend"
                )
            })?;

            info!("Connecting to PostgreSQL...");
            let db = PostgresQueryable::connect(&pg_config).await?;
            info!("PostgreSQL connection established");

            if config.storage.run_migrations {
                run_lab_migrations(db.pool()).await?;
            }

            let db = Arc::new(db);
            (
                CostTracker::with_pricing(
                    Arc::new(SqlApiCallRepository::new(db.clone())),
                    pricing.clone(),
                ),
                BaselineManager::new(Arc::new(SqlBaselineRepository::new(db))),
            )
        }
    };

    let platform_keys = config.lab.platform_keys()?;
    if platform_keys.is_empty() {
        warn!("No platform keys configured; sessions need user keys");
    }

    let vault = ApiKeyVault::new(Arc::new(InMemoryApiKeyRepository::new()))
        .with_platform_keys(platform_keys);

    Ok(AppState::new(AppStateParts {
        settings: config.lab.sandbox_settings(),
        gateways: GatewayRegistry::with_simulated_defaults(&pricing),
        vault,
        tracker,
        baselines,
        thresholds: config.analyzer,
        pricing,
    }))
}
