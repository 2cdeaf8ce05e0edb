//! Ingestion endpoint.
//!
//! - `/api/v1/push` : any method, always `200 Status code: 200`
//!
//! Non-validating: the body is never read. The only side effect is logging
//! the request headers.

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

pub const PUSH_PATH: &str = "/api/v1/push";

pub async fn push(headers: HeaderMap) -> impl IntoResponse {
    tracing::info!(request_headers = ?headers, "request");

    let status = StatusCode::OK;
    (status, format!("Status code: {}", status.as_u16()))
}
