use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use elemizer_client::{FetchConfig, ReqwestFetcher, ScraperCounter};
use elemizer_core::CountConfig;
use elemizer_core::util::env_or;
use elemizer_db::{Database, DatabaseConfig};
use elemizer_server::routes;
use elemizer_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("elemizer=info".parse()?))
        .with_target(false)
        .init();

    let port: u16 = env_or("ELEMIZER_SERVER_PORT", 3000)?;
    let addr = format!("0.0.0.0:{port}");

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let config = CountConfig::from_env()?;
    let fetcher = ReqwestFetcher::with_config(&FetchConfig::from_env()?)?;
    tracing::info!(
        dedup_window_secs = config.dedup_window.num_seconds(),
        policy = %config.element_count_policy,
        "Count pipeline configured"
    );

    let state = Arc::new(AppState {
        db,
        fetcher,
        counter: ScraperCounter::new(),
        config,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
