//! `POST /v1/traces` — the OTLP/HTTP ingress endpoint (spec.md §6).

use std::io::Read;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use flate2::read::GzDecoder;
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use prost::Message;

use sa_domain::preprocess::preprocess;

use crate::ingest_error::IngestError;
use crate::state::AppState;

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase()
}

fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase().contains("gzip"))
        .unwrap_or(false)
}

fn decompress_if_gzip(headers: &HeaderMap, body: Vec<u8>) -> Result<Vec<u8>, IngestError> {
    if !is_gzip(headers) {
        return Ok(body);
    }
    let mut decoder = GzDecoder::new(body.as_slice());
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| {
            tracing::error!(error = %e, "failed to decompress gzip body");
            IngestError::InvalidGzip
        })?;
    Ok(out)
}

pub async fn receive_traces(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, IngestError> {
    let content_type = content_type(&headers);
    let body = decompress_if_gzip(&headers, body.to_vec())?;

    let (request, is_json) = if content_type.contains("application/json") {
        let request: ExportTraceServiceRequest = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(error = %e, "failed to parse JSON trace payload");
            IngestError::InvalidJson
        })?;
        (request, true)
    } else if content_type.contains("application/x-protobuf") {
        let request = ExportTraceServiceRequest::decode(body.as_slice()).map_err(|e| {
            tracing::error!(error = %e, "failed to parse protobuf trace payload");
            IngestError::InvalidProtobuf
        })?;
        (request, false)
    } else {
        return Err(IngestError::UnsupportedMediaType);
    };

    let events = preprocess(&request);
    if events.is_empty() {
        tracing::debug!("no relevant communication events found");
    } else {
        tracing::debug!(count = events.len(), "created communication events");
        for event in &events {
            state
                .filter_registry
                .register(event.conversation_id(), event.workforce_name());
            state.distributor.publish(event);
        }
    }

    let response = ExportTraceServiceResponse::default();
    Ok(if is_json {
        (
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            serde_json::to_vec(&response).unwrap_or_default(),
        )
            .into_response()
    } else {
        (
            [(axum::http::header::CONTENT_TYPE, "application/x-protobuf")],
            response.encode_to_vec(),
        )
            .into_response()
    })
}
