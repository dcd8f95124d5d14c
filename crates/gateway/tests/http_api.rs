//! Integration tests driving the assembled `axum::Router` through
//! `tower::ServiceExt::oneshot`, grounded on
//! `examples/original_source/test/test_filter_api.py` (the filter-discovery
//! endpoints) and `test_factories.py` (the ingress scenarios S1/S3).
//!
//! These exercise the real HTTP surface end to end rather than calling
//! `sa_domain::preprocess` directly, so a routing or content-negotiation
//! regression in `sa-gateway` shows up here even if the domain crate's own
//! unit tests stay green.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use sa_gateway::api::router;
use sa_gateway::state::AppState;

fn app() -> axum::Router {
    router(AppState::new(24))
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// A minimal OTLP/JSON export request carrying one `before_agent` span with
/// the header attributes S1 requires, matching the wire shape
/// `opentelemetry-proto`'s serde impl expects (`{"value": {"stringValue":
/// ...}}` oneof encoding).
fn s1_trace_request_json() -> serde_json::Value {
    serde_json::json!({
        "resourceSpans": [{
            "resource": {
                "attributes": [
                    {"key": "agentic_layer.workforce", "value": {"stringValue": "acme-support"}}
                ]
            },
            "scopeSpans": [{
                "spans": [{
                    "name": "before_agent",
                    "startTimeUnixNano": "1700000000000000000",
                    "attributes": [
                        {"key": "agent_communication_dashboard", "value": {"boolValue": true}},
                        {"key": "conversation_id", "value": {"stringValue": "c1"}},
                        {"key": "agent_name", "value": {"stringValue": "alice"}},
                        {"key": "invocation_id", "value": {"stringValue": "inv-1"}}
                    ]
                }]
            }]
        }]
    })
}

#[tokio::test]
async fn unsupported_media_type_returns_415() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/traces")
                .header("content-type", "text/plain")
                .body(Body::from("whatever"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn malformed_protobuf_body_returns_400_with_expected_message() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/traces")
                .header("content-type", "application/x-protobuf")
                .body(Body::from(vec![0xFF, 0xFF, 0xFF]))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, b"Invalid protobuf data");
}

#[tokio::test]
async fn malformed_gzip_body_returns_400_with_expected_message() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/traces")
                .header("content-type", "application/x-protobuf")
                .header("content-encoding", "gzip")
                .body(Body::from(b"not actually gzip".to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, b"Invalid gzip data");
}

#[tokio::test]
async fn s1_json_trace_ingestion_registers_conversation_id() {
    let app = app();
    let payload = serde_json::to_vec(&s1_trace_request_json()).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/traces")
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let filters_response = app
        .oneshot(Request::builder().uri("/api/filters").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(filters_response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(filters_response).await).unwrap();
    assert_eq!(body["conversation_ids"], serde_json::json!(["c1"]));
    assert_eq!(body["workforce_names"], serde_json::json!(["acme-support"]));
}

#[tokio::test]
async fn ingesting_spans_with_no_relevant_events_still_returns_200() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/traces")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"resourceSpans": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn filters_stats_endpoint_reports_zero_counts_initially() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/filters/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["conversation_ids_count"], 0);
    assert_eq!(body["workforce_names_count"], 0);
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let response = app()
        .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
}
