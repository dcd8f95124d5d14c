//! `GET /ws` — the subscriber WebSocket endpoint (spec.md §6, §4.10).

use std::collections::HashMap;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};

use sa_domain::filter::FilterCriteria;

use crate::distributor::Distributor;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let filter = FilterCriteria::from_query_params(&params);
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(socket: WebSocket, state: AppState, filter: FilterCriteria) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = Distributor::make_sink();

    let handle = match state.distributor.subscribe(tx, filter.clone()) {
        Ok(handle) => handle,
        Err(()) => {
            tracing::error!("failed to serialize welcome frame, closing connection");
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: 4500,
                    reason: "Internal server error".into(),
                })))
                .await;
            return;
        }
    };
    tracing::info!(filter = %filter.describe(), "subscriber connected");

    let mut writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Text(text))) => handle_client_frame(&text),
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "subscriber stream error, closing");
                        break;
                    }
                    _ => {}
                }
            }
            _ = &mut writer => break,
        }
    }

    writer.abort();
    state.distributor.unsubscribe(handle);
    tracing::info!("subscriber disconnected");
}

/// Client frames are ignored except `{"type": "update_filter", ...}`, which
/// is reserved for future use and currently only logged (spec.md §6).
fn handle_client_frame(text: &str) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };
    if value.get("type").and_then(|v| v.as_str()) == Some("update_filter") {
        tracing::debug!(frame = %text, "update_filter received (future enhancement, no-op)");
    }
}
