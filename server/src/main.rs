//! Mockbase Server binary.

use mockbase_engine::Store;
use mockbase_server::{build_app, config::Config, models, now_millis, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mockbase_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Mockbase Server on {}:{}", config.host, config.port);

    // Load models and open the store
    let schema = models::load_models(&config.models_path)?;
    tracing::info!(
        "Loaded {} model(s) from {}",
        schema.len(),
        config.models_path.display()
    );

    let store = Store::open(schema, &config.storage_path, now_millis())?;
    let meta = store.snapshot_metadata();
    tracing::info!(
        "Store ready at {} ({} records in {} collections)",
        config.storage_path.display(),
        meta.record_count,
        meta.collection_count
    );

    if config.auth_enabled() {
        tracing::info!("Token authentication enabled");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(store, config);
    let app = build_app(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, flushing store");
    state.store.read().await.flush()?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
