//! Stride Herald API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use stride_common::config::AppConfig;
use stride_common::db::create_pool;
use stride_engine::dispatcher::EventDispatcher;
use stride_gateway::{ExpoPushClient, PushGateway};

use stride_api::routes::create_router;
use stride_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("stride_api=debug,stride_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Stride Herald API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // Build push gateway client
    let gateway: Arc<dyn PushGateway> = Arc::new(ExpoPushClient::new(
        config.push_gateway_url.clone(),
        Duration::from_secs(config.push_timeout_secs),
    )?);
    tracing::info!(endpoint = %config.push_gateway_url, "Push gateway client ready");

    // Build dispatcher and application state
    let dispatcher = EventDispatcher::new(pool, gateway, config.push_chunk_concurrency);
    let state = AppState::new(dispatcher.clone(), config.clone());

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal, stopping gracefully...");
        })
        .await?;

    // Drain in-flight background notification pipelines so an acknowledged
    // follow never loses its notification on shutdown.
    dispatcher.background_tasks().drain().await;

    tracing::info!("Stride Herald API server stopped.");
    Ok(())
}
