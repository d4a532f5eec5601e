mod acl;
mod api;
mod config;
mod error;
mod maintenance;
mod registry;
mod secured;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::acl::NetworkRangeStore;
use crate::config::{Config, ADMIN_KEY_ENV};
use crate::registry::ServerRegistry;
use crate::secured::Secret;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("server_browserd=info"))
        )
        .init();

    tracing::info!("Starting server-browserd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/server-browser/browserd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    let admin_key = match config.access.resolve_admin_key(std::env::var(ADMIN_KEY_ENV).ok()) {
        Some(key) => Secret::new(key),
        None => {
            tracing::warn!(
                "No admin key configured (set {} or access.admin_key); admin endpoints are disabled",
                ADMIN_KEY_ENV
            );
            Secret::generate()
        }
    };

    // Refuse to start on a corrupt list rather than run with a partial one
    let ban_list = NetworkRangeStore::open("ban_list", &config.access.ban_list_path, admin_key.clone())
        .context("Failed to load ban list")?;
    let allow_list = NetworkRangeStore::open("verified_list", &config.access.allow_list_path, admin_key)
        .context("Failed to load verified list")?;

    let heartbeat_timeout = config
        .registry
        .heartbeat_timeout()
        .context("Invalid heartbeat timeout")?;
    let sweep_interval = config
        .registry
        .sweep_interval()
        .context("Invalid sweep interval")?;

    let registry = Arc::new(ServerRegistry::new(heartbeat_timeout));
    tracing::info!("Heartbeat timeout is {}s", registry.heartbeat_timeout().num_seconds());

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Spawn registry sweeper
    let sweeper_handle = tokio::spawn(maintenance::run(
        Arc::clone(&registry),
        sweep_interval,
        cancel.clone(),
    ));

    // Build API router
    let app_state = api::routes::AppState {
        registry,
        ban_list: Arc::new(ban_list),
        allow_list: Arc::new(allow_list),
        trust_forwarded_for: config.api.trust_forwarded_for,
    };
    let app = api::routes::router(app_state);

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    // Run server with graceful shutdown
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { server_cancel.cancelled().await })
        .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    cancel.cancel();

    let _ = tokio::join!(sweeper_handle, server_handle);

    tracing::info!("Shutdown complete");
    Ok(())
}
