//! HTTP Server
//!
//! axum router for the chat relay and patient views, plus the serve loop.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;

use crate::error::ApiError;
use axum::Router;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Full application router with request tracing.
pub fn router(state: AppState) -> Router {
    routes::api_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(state: AppState, bind: &str, port: u16) -> Result<(), ApiError> {
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| ApiError::ConfigError(format!("Invalid bind address {}:{}: {}", bind, port, e)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::ConfigError(format!("Failed to bind {}: {}", addr, e)))?;
    info!(addr = %addr, environment = %state.environment, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::ConfigError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
