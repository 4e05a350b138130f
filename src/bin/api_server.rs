// API Server Binary Entry Point
//
// Purpose: Start the Axum soil advisory server
// Usage: cargo run --bin api_server

use kisaan_connect::{create_router, AppState, ServerConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default log level: info for our crate, warn for others
                "kisaan_connect=info,tower_http=debug,axum=debug,warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting KisaanConnect soil service...");

    let config = ServerConfig::from_env()?;

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {:?}", config.data_dir);
    tracing::info!("  SOIL_CSV: {:?}", config.soil_csv);
    tracing::info!("  SCORING_CONFIG: {:?}", config.scoring_config);
    tracing::info!("  SUITABILITY_SEED: {:?}", config.suitability_seed);
    tracing::info!("  LANGUAGE_CAPACITY: {}", config.language_capacity);
    tracing::info!("  PORT: {}", config.port);

    // Loads scoring config and district data
    let state = AppState::new(&config)?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
