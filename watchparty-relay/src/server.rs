use crate::config::RelayConfig;
use crate::room::RoomRegistry;
use crate::signaling::{create_room, join_room, ws_handler};
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub fn router(registry: RoomRegistry) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/rooms", post(create_room))
        .route("/rooms/{token}/join", post(join_room))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(registry)
}

/// Binds `config.bind` and runs the relay until the process is stopped.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind relay on {}", config.bind))?;
    serve_on(listener, RoomRegistry::new(config.registry)).await
}

pub async fn serve_on(listener: TcpListener, registry: RoomRegistry) -> Result<()> {
    info!("Relay listening on ws://{}/ws", listener.local_addr()?);
    axum::serve(listener, router(registry))
        .await
        .context("Relay server stopped")?;
    Ok(())
}
