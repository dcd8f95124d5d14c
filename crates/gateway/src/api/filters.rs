//! `GET /api/filters` and `GET /api/filters/stats` (spec.md §6).

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn list_filters(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "conversation_ids": state.filter_registry.conversation_ids(),
        "workforce_names": state.filter_registry.workforce_names(),
    }))
}

pub async fn filter_stats(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::to_value(state.filter_registry.stats()).unwrap_or(Value::Null))
}
