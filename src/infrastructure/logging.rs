//! Tracing subscriber setup

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingConfig};

fn default_directives(level: &str) -> String {
    format!("{level},sqlx=warn,tower_http=info,hyper=warn")
}

/// `RUST_LOG` wins over the configured level
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which happens
/// when several commands or tests initialize logging in one process.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = build_filter(&config.level);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::info!(level = %config.level, format = ?config.format, "Logging initialized");
    }

    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cap_dependencies() {
        let directives = default_directives("debug");

        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("sqlx=warn"));
    }

    #[test]
    fn test_second_init_is_rejected() {
        let config = LoggingConfig::default();
        init_logging(&config);

        assert!(!init_logging(&config));
    }
}
