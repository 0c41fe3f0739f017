use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use upload_gateway::{
    config::Config,
    db::create_pool,
    routes::create_router,
    storage::{AdapterRegistry, CredentialStore, FileCredentialStore, PgCredentialStore},
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let _log_guard = init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);

    if config.auth.external_upload_api_key.trim().is_empty() {
        warn!("EXTERNAL_UPLOAD_API_KEY is not set; every upload will be rejected with 500");
    }

    // Credential source
    let credentials: Arc<dyn CredentialStore> = match &config.database {
        Some(database) => {
            info!("Reading storage credentials from Postgres");
            Arc::new(PgCredentialStore::new(create_pool(database).await?))
        }
        None => {
            info!("Reading storage credentials from {:?}", config.storage.credentials_file);
            Arc::new(FileCredentialStore::new(config.storage.credentials_file.clone()))
        }
    };

    let adapters = Arc::new(AdapterRegistry::from_config(&config.upload)?);

    let state = AppState {
        config: config.clone(),
        credentials,
        adapters,
    };

    let app = create_router(state);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        // Keep serving; only an explicit signal stops the server
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
