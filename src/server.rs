//! HTTP endpoint exposing the activity counters.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::sink::ActivityMetrics;

pub fn router(metrics: Arc<ActivityMetrics>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(get_metrics))
        .with_state(metrics)
}

async fn index() -> Html<&'static str> {
    Html("<html><head><title>spent</title></head><body><h1>spent</h1><p><a href=\"/metrics\">Metrics</a></p></body></html>")
}

async fn get_metrics(State(metrics): State<Arc<ActivityMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}

/// Bind the metrics listener on `addr`.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Serving metrics on http://{}/metrics", listener.local_addr()?);
    Ok(listener)
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    metrics: Arc<ActivityMetrics>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Metrics server failed")
}
