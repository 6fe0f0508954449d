#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use std::process::ExitCode;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chapter_portal::config::Config;
use chapter_portal::db;
use chapter_portal::routes;
use chapter_portal::state::AppState;
use chapter_portal::store::{InMemoryStore, PgStore, PortalStore};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Fatal error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    tracing::info!(addr = %config.listen_addr, "Starting chapter portal");

    let store: Arc<dyn PortalStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url, config.database_max_connections).await?;
            db::apply_schema(&pool).await?;
            tracing::info!("Connected to PostgreSQL");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            Arc::new(InMemoryStore::new())
        }
    };

    if config.blob.base_url.is_none() {
        tracing::warn!("BLOB_STORE_URL not set; document uploads will fail");
    }

    let cors = cors_layer(config.cors_allowed_origin.as_deref())?;
    let listen_addr = config.listen_addr;

    let state = AppState::new(config, store);
    state.content.seed_defaults().await?;

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::permissive());
    };
    Ok(CorsLayer::new()
        .allow_origin(HeaderValue::from_str(origin)?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any))
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .ok();
    tracing::info!("Received shutdown signal");
}
