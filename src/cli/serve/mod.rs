//! Serve command - runs the lab API server

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::api::create_router_with_state;
use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::observability::init_metrics;
use crate::infrastructure::sandbox::spawn_purge_task;

/// Arguments for the serve command
#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,
}

/// Run the API server until Ctrl+C or SIGTERM
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let state = crate::create_app_state_with_config(&config).await?;
    let metrics = init_metrics(&config.metrics);

    let purge_interval = Duration::from_secs(config.lab.purge_interval_secs.max(1));
    let purge_task = spawn_purge_task(state.lab.manager().clone(), purge_interval);

    let app = create_router_with_state(state, metrics, &config.metrics.path);

    let addr = build_socket_addr(&config, &args)?;
    info!("Starting lab API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    info!("Lab API server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig, args: &ServeArgs) -> anyhow::Result<SocketAddr> {
    let host = args.host.as_deref().unwrap_or(&config.server.host);
    let port = args.port.unwrap_or(config.server.port);

    Ok(SocketAddr::from((host.parse::<std::net::IpAddr>()?, port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_overrides() {
        let config = AppConfig::default();

        let addr = build_socket_addr(&config, &ServeArgs::default()).unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8080");

        let args = ServeArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some(9000),
        };
        assert_eq!(build_socket_addr(&config, &args).unwrap().to_string(), "127.0.0.1:9000");

        let bad = ServeArgs {
            host: Some("not-an-ip".to_string()),
            port: None,
        };
        assert!(build_socket_addr(&config, &bad).is_err());
    }
}
