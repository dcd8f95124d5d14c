//! Route assembly: one `Router<AppState>` built from per-concern modules.

mod filters;
mod health;
mod traces;
mod ws;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/traces", post(traces::receive_traces))
        .route("/ws", get(ws::ws_handler))
        .route("/api/filters", get(filters::list_filters))
        .route("/api/filters/stats", get(filters::filter_stats))
        .route("/v1/health", get(health::health))
        .with_state(state)
}
