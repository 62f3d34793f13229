//! Liveness endpoint: a static banner on `/` and the health registry on
//! `/health`.

use crate::diagnostics::health;
use anyhow::{Context, Result};
use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

pub const BANNER: &str = "📹 .REC is active and watching...";

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub async fn run_gateway(host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("parse health endpoint bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind health endpoint socket")?;

    run_gateway_with_listener(listener).await
}

pub async fn run_gateway_with_listener(listener: tokio::net::TcpListener) -> Result<()> {
    let local = listener
        .local_addr()
        .context("get health endpoint local address")?;
    tracing::info!("Web server online at http://{local}");
    health::mark_component_ok("http");

    axum::serve(listener, build_app())
        .await
        .context("serve health endpoint")?;

    Ok(())
}

pub fn build_app() -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

async fn handle_root() -> &'static str {
    BANNER
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "runtime": health::snapshot_json(),
    }))
}
