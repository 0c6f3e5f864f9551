//! Lookup of gateway adapters by provider

use std::collections::HashMap;
use std::sync::Arc;

use super::simulated::SimulatedGateway;
use crate::domain::LabError;
use crate::domain::pricing::PricingTable;
use crate::domain::provider::{ProviderGateway, ProviderKind};

/// Adapters keyed by the provider they serve
#[derive(Debug, Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<ProviderKind, Arc<dyn ProviderGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a simulated adapter for every provider
    pub fn with_simulated_defaults(pricing: &PricingTable) -> Self {
        ProviderKind::ALL
            .into_iter()
            .fold(Self::new(), |registry, provider| {
                registry.with_gateway(Arc::new(
                    SimulatedGateway::new(provider).with_pricing(pricing.clone()),
                ))
            })
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ProviderGateway>) -> Self {
        self.register(gateway);
        self
    }

    /// Register an adapter, replacing any adapter for the same provider
    pub fn register(&mut self, gateway: Arc<dyn ProviderGateway>) {
        let provider = gateway.provider();
        if self.gateways.insert(provider, gateway).is_some() {
            tracing::debug!(provider = %provider, "Replaced gateway adapter");
        }
    }

    pub fn get(&self, provider: ProviderKind) -> Result<Arc<dyn ProviderGateway>, LabError> {
        self.gateways.get(&provider).cloned().ok_or_else(|| {
            LabError::provider_unavailable(provider.as_str(), "No gateway registered for provider")
        })
    }

    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut providers: Vec<_> = self.gateways.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::default_pricing_table;
    use crate::domain::provider::MockProviderGateway;

    #[test]
    fn test_missing_gateway_is_unavailable() {
        let registry = GatewayRegistry::new();
        let err = registry.get(ProviderKind::Anthropic).unwrap_err();

        assert!(matches!(err, LabError::ProviderUnavailable { ref provider, .. } if provider == "anthropic"));
    }

    #[test]
    fn test_simulated_defaults_cover_all_providers() {
        let registry = GatewayRegistry::with_simulated_defaults(default_pricing_table());

        for provider in ProviderKind::ALL {
            assert_eq!(registry.get(provider).unwrap().provider(), provider);
        }
        assert_eq!(registry.providers().len(), 3);
    }

    #[test]
    fn test_register_replaces_adapter() {
        let mut mock = MockProviderGateway::new();
        mock.expect_provider().return_const(ProviderKind::OpenAi);

        let mock: Arc<dyn ProviderGateway> = Arc::new(mock);

        let mut registry = GatewayRegistry::with_simulated_defaults(default_pricing_table());
        registry.register(mock.clone());

        assert_eq!(registry.providers().len(), 3);
        assert!(Arc::ptr_eq(&registry.get(ProviderKind::OpenAi).unwrap(), &mock));
    }
}
