mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use codequest_sandbox::{Sandbox, SandboxConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub sandbox: Sandbox,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("CodeQuest API booting...");

    let config_path = std::env::var("SANDBOX_CONFIG").ok().map(PathBuf::from);
    let config = SandboxConfig::load_from(config_path.as_deref())
        .context("Failed to load sandbox configuration")?;

    info!(
        max_operations = config.max_operations,
        timeout_ms = config.execution_timeout.as_millis() as u64,
        denied_globals = config.denied_globals.len(),
        "Sandbox configured"
    );

    let state = Arc::new(AppState {
        sandbox: Sandbox::new(config),
    });

    let app = Router::new().merge(routes::routes()).with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to grade submissions");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
