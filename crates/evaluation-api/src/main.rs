//! Evaluation API
//!
//! REST API for deployment intake, check results and pipeline queries

use anyhow::{Context, Result};
use evaluation_api::{create_router, AppState, Config, Storage};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evaluation_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Evaluation API");
    info!("Data directory: {}", config.data_dir.display());
    info!("Reject duplicate nonces: {}", config.reject_duplicate_nonce);
    if config.api_token.is_none() {
        info!("API_TOKEN not set, mutating routes accept any caller");
    }

    let storage = Storage::open(&config.data_dir, config.reject_duplicate_nonce)
        .await
        .context("Failed to open logs")?;

    let state = AppState {
        storage,
        api_token: config.api_token.clone(),
    };

    let app = create_router(state);

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Evaluation API running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
