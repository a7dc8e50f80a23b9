//! HTTP endpoint serving the gauges to Prometheus.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ExporterError;
use crate::metrics::CoinMetrics;

/// Router with a single `GET /metrics` route.
pub fn router(metrics: Arc<CoinMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .layer(TraceLayer::new_for_http())
}

async fn metrics_handler(State(metrics): State<Arc<CoinMetrics>>) -> Response {
    match metrics.render() {
        Ok(body) => ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve(addr: SocketAddr, metrics: Arc<CoinMetrics>) -> Result<(), ExporterError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Metrics available at http://{}/metrics", addr);
    axum::serve(listener, router(metrics)).await?;
    Ok(())
}
