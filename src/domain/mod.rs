//! Domain layer - Core business logic and entities

pub mod analysis;
pub mod api_key;
pub mod baseline;
pub mod call;
pub mod error;
pub mod pricing;
pub mod provider;
pub mod session;
pub mod simulation;
pub mod storage;
pub mod strategy;

pub use analysis::{AnalyzerThresholds, TokenAnalysis, TokenAnalyzer, TokenDistribution};
pub use api_key::{
    ApiKeyId, ApiKeyRepository, ApiKeyValidationError, StoredApiKey, validate_api_key_secret,
};
pub use baseline::{
    Baseline, BaselineComparison, BaselineRepository, BaselineValidationError, CallAverages,
};
pub use call::{ApiCallRecord, ApiCallRepository, ExperimentSummary, NewApiCall, RecordedCall};
pub use error::{LabError, LabErrorKind, ResourceLimitReason};
pub use pricing::{CostBreakdown, PricingTable, TokenBreakdown, calculate_cost};
pub use provider::{GenerateRequest, GeneratedResponse, ProviderGateway, ProviderKind};
pub use session::{
    ExperimentSession, IsolationLevel, KeySource, ResourceLimits, SessionConfig, SessionId,
    SessionMetrics, SessionSnapshot,
};
pub use simulation::{UsageProfile, UsageProjection, UsageSimulator};
pub use storage::{Queryable, Row};
pub use strategy::{
    OptimizationStrategy, OptimizationSuggester, OptimizationSuggestion, StrategyCategory,
    StrategyContext, StrategyRanking, StrategyRegistry,
};
