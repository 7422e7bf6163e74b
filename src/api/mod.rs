use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod handlers;
pub mod webhook;

/// Build the full application router: health, the gateway webhook, and the
/// purchase API nested under `/api/v1`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/webhooks/yookassa", post(webhook::yookassa_webhook))
        .nest("/api/v1", api_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Routes relative to `/api/v1`.
fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/purchases", post(handlers::create_purchase))
        .route("/locations", get(handlers::list_locations))
}
