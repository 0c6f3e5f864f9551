//! Application state for shared services

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::analysis::{AnalyzerThresholds, TokenAnalyzer};
use crate::domain::pricing::{PricingTable, default_pricing_table};
use crate::domain::provider::ProviderKind;
use crate::domain::simulation::UsageSimulator;
use crate::domain::strategy::{OptimizationSuggester, StrategyRegistry};
use crate::infrastructure::api_key::{ApiKeyVault, InMemoryApiKeyRepository};
use crate::infrastructure::baseline::{BaselineManager, InMemoryBaselineRepository};
use crate::infrastructure::call::{CostTracker, InMemoryApiCallRepository};
use crate::infrastructure::gateway::GatewayRegistry;
use crate::infrastructure::sandbox::{SandboxManager, SandboxSettings};
use crate::infrastructure::services::LabService;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub lab: Arc<LabService>,
    pub tracker: Arc<CostTracker>,
    pub baselines: Arc<BaselineManager>,
    pub vault: Arc<ApiKeyVault>,
    pub analyzer: Arc<TokenAnalyzer>,
    pub suggester: Arc<OptimizationSuggester>,
    pub simulator: Arc<UsageSimulator>,
    pub pricing: Arc<PricingTable>,
}

/// Parts the state is assembled from
pub struct AppStateParts {
    pub settings: SandboxSettings,
    pub pricing: PricingTable,
    pub thresholds: AnalyzerThresholds,
    pub gateways: GatewayRegistry,
    pub vault: ApiKeyVault,
    pub tracker: CostTracker,
    pub baselines: BaselineManager,
}

impl AppState {
    pub fn new(parts: AppStateParts) -> Self {
        let registry = StrategyRegistry::with_defaults();
        let manager = Arc::new(Mutex::new(SandboxManager::new(parts.settings)));

        let lab = LabService::new(
            manager,
            parts.gateways,
            parts.vault.clone(),
            parts.tracker.clone(),
        );

        Self {
            lab: Arc::new(lab),
            tracker: Arc::new(parts.tracker),
            baselines: Arc::new(parts.baselines),
            vault: Arc::new(parts.vault),
            analyzer: Arc::new(TokenAnalyzer::new(parts.thresholds)),
            suggester: Arc::new(OptimizationSuggester::new(registry.clone())),
            simulator: Arc::new(UsageSimulator::new(parts.pricing.clone(), registry)),
            pricing: Arc::new(parts.pricing),
        }
    }

    /// In-memory state with a platform key for every provider
    pub fn for_testing() -> Self {
        let pricing = default_pricing_table().clone();
        let vault = ProviderKind::ALL.into_iter().fold(
            ApiKeyVault::new(Arc::new(InMemoryApiKeyRepository::new())),
            |vault, provider| vault.with_platform_key(provider, format!("sk-test-{}", provider)),
        );

        Self::new(AppStateParts {
            settings: SandboxSettings::default(),
            gateways: GatewayRegistry::with_simulated_defaults(&pricing),
            vault,
            tracker: CostTracker::with_pricing(
                Arc::new(InMemoryApiCallRepository::new()),
                pricing.clone(),
            ),
            baselines: BaselineManager::new(Arc::new(InMemoryBaselineRepository::new())),
            thresholds: AnalyzerThresholds::default(),
            pricing,
        })
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        self.suggester.registry()
    }
}
