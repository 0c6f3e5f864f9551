//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, LabConfig, LogFormat, LoggingConfig, ServerConfig, StorageBackend, StorageConfig,
};
