//! `GET /v1/health` — liveness probe, supplemented from the original
//! implementation's `/health` route (SPEC_FULL.md §4).

use axum::response::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
