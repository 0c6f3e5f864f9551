use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::analysis::AnalyzerThresholds;
use crate::domain::provider::ProviderKind;
use crate::domain::session::ResourceLimits;
use crate::domain::LabError;
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::sandbox::{DEFAULT_GRACE_PERIOD_MS, SandboxSettings};
use crate::infrastructure::storage::PostgresConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub storage: StorageConfig,
    pub lab: LabConfig,
    pub analyzer: AnalyzerThresholds,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

/// Where tracked calls and baselines are kept
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Falls back to `DATABASE_URL` when unset
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Apply schema migrations at startup
    pub run_migrations: bool,
}

/// Sandbox limits, session timing and platform credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub limits: ResourceLimits,
    pub grace_period_ms: u64,
    pub purge_interval_secs: u64,
    /// Platform key per provider name
    pub platform_keys: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            purge_interval_secs: 60,
            platform_keys: HashMap::new(),
        }
    }
}

impl StorageConfig {
    /// Postgres settings, or `None` when no database URL is available
    pub fn postgres(&self) -> Option<PostgresConfig> {
        self.database_url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
            .map(|url| PostgresConfig::new(url).with_max_connections(self.max_connections))
    }
}

impl LabConfig {
    pub fn sandbox_settings(&self) -> SandboxSettings {
        SandboxSettings {
            limits: self.limits,
            grace_period_ms: self.grace_period_ms,
        }
    }

    /// Platform keys keyed by provider; unknown provider names are rejected
    pub fn platform_keys(&self) -> Result<HashMap<ProviderKind, String>, LabError> {
        self.platform_keys
            .iter()
            .map(|(provider, key)| Ok((provider.parse::<ProviderKind>()?, key.clone())))
            .collect()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
