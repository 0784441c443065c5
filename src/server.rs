//! HTTP endpoints: landing page, metrics exposition and configuration reload.

use crate::metrics::exposition::CONTENT_TYPE;
use crate::state::ExporterState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;

pub const METRICS_PATH: &str = "/metrics";

const LANDING_PAGE: &str = r#"<html>
<head><title>Azure Exporter</title></head>
<body>
<h1>Azure Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

pub fn router(state: Arc<ExporterState>) -> Router {
    Router::new()
        .route("/", get(landing))
        .route(METRICS_PATH, get(metrics))
        .route("/-/reload", post(reload))
        .with_state(state)
}

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Partial collection failures never fail the scrape; only an encoding error does
async fn metrics(State(state): State<Arc<ExporterState>>) -> Response {
    let started = Instant::now();
    let snapshot = state.snapshot();
    let samples = snapshot.collector.collect().await;
    state.metrics.observe_scrape(started.elapsed(), samples.len());

    match state.metrics.encode(&samples) {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn reload(State(state): State<Arc<ExporterState>>) -> Response {
    match state.reload().await {
        Ok(()) => (StatusCode::OK, "configuration reloaded\n").into_response(),
        Err(e) => {
            tracing::error!("Failed to reload configuration: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)).into_response()
        }
    }
}
