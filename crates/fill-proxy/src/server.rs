//! HTTP server for the fill proxy
//!
//! Provides /, /health and /fill/{*path} endpoints.

use crate::fill::FillOrchestrator;
use crate::types::HealthResponse;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for the HTTP server
pub struct ServerState {
    pub orchestrator: FillOrchestrator,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(orchestrator: FillOrchestrator) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(greetings))
        .route("/health", get(health))
        .route("/fill/{*path}", get(fill))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server, returning once `shutdown` resolves and in-flight requests finish
pub async fn start_server<F>(state: SharedState, port: u16, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn greetings() -> &'static str {
    "Image fill proxy. Request /fill/<width>/<height>/<host>/<path-to-image.jpg>"
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        index: state.orchestrator.index_stats(),
        store: state.orchestrator.store().stats(),
        requests: state.orchestrator.stats(),
    })
}

/// Resize an upstream JPEG, serving from cache when possible
///
/// The fingerprint is the raw request path, so percent-escapes such as `%2F`
/// reach the upstream URL and the filename as sent.
async fn fill(State(state): State<SharedState>, uri: Uri, headers: HeaderMap) -> Response {
    let fingerprint = uri.path();

    match state.orchestrator.fill(fingerprint, &headers).await {
        Ok(outcome) => {
            let cache_header = if outcome.served_from_cache {
                "HIT"
            } else {
                "MISS"
            };

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "image/jpeg")
                .header(header::CACHE_CONTROL, "public, max-age=86400")
                .header("X-Cache", cache_header)
                .body(Body::from(outcome.body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) => {
            warn!(fingerprint = %fingerprint, error = %e, "Fill request failed");
            e.into_response()
        }
    }
}
