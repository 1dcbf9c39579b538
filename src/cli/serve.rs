// src/cli/serve.rs — Run the HTTP server

use crate::api::{self, ApiState};
use crate::infra::config::Config;
use crate::infra::paths;

/// Serve until Ctrl-C, then release every live conversation.
pub async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    paths::ensure_dirs().await?;
    let coordinator = super::build_coordinator(&config)?;
    let state = ApiState {
        coordinator: coordinator.clone(),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    api::start_server(&config.server, state, shutdown).await?;
    coordinator.shutdown();
    Ok(())
}
