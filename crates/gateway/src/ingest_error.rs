//! Errors surfaced by `POST /v1/traces`, mapped to the exact status codes
//! and bodies spec.md §6/§7 call for. Everything below the span loop
//! (classification, extraction, timestamp conversion) recovers locally and
//! never reaches this type — only framing-level failures do.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("unsupported content-type")]
    UnsupportedMediaType,

    #[error("invalid gzip data")]
    InvalidGzip,

    #[error("invalid protobuf data")]
    InvalidProtobuf,

    #[error("invalid json data")]
    InvalidJson,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            IngestError::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported Content-Type. Use application/json or application/x-protobuf.",
            ),
            IngestError::InvalidGzip => (StatusCode::BAD_REQUEST, "Invalid gzip data"),
            IngestError::InvalidProtobuf => (StatusCode::BAD_REQUEST, "Invalid protobuf data"),
            IngestError::InvalidJson => (StatusCode::BAD_REQUEST, "Invalid JSON data"),
        };
        (status, body).into_response()
    }
}
