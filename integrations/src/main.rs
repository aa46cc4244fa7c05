use anyhow::{Context, Result};
use formsync::config::{load_config, FormsyncConfig};
use formsync::credentials::TokenStore;
use formsync_integrations::api::{create_router, ApiState};
use formsync_integrations::registry::build_integrations;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formsync=info,formsync_integrations=info".into()),
        )
        .init();

    info!("formsync starting...");

    // Read configuration from file and environment
    let config_path =
        std::env::var("FORMSYNC_CONFIG").unwrap_or_else(|_| "formsync.toml".to_string());
    let mut config = if Path::new(&config_path).exists() {
        load_config(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
        FormsyncConfig::default()
    };
    config.apply_env_overrides();

    let encryption_key = std::env::var("FORMSYNC_ENCRYPTION_KEY")
        .context("FORMSYNC_ENCRYPTION_KEY is required (base64-encoded 32-byte key)")?;

    info!(
        config_path = %config_path,
        tokens_db = %config.storage.tokens_db,
        port = config.server.port,
        integrations = config.integrations.len(),
        "Configuration loaded"
    );

    // Initialize token store
    let token_store = Arc::new(
        TokenStore::new(&config.storage.tokens_db, &encryption_key)
            .context("Failed to initialize token store")?,
    );
    info!("Token store initialized");

    let integrations = build_integrations(&config, Arc::clone(&token_store))?;

    // Start HTTP API server
    let port = config.server.port;
    let api_state = ApiState {
        integrations,
        token_store,
        config: Arc::new(config),
    };
    let router = create_router(api_state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind API port")?;
    info!(port = port, "Integration API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Integration API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("formsync stopped");

    Ok(())
}
