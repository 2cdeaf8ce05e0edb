//! Axum router wiring.
//!
//! Currently exposes the single ingestion route.

use axum::{routing::any, Router};

use crate::ingest;

pub fn build_router() -> Router {
    Router::new().route(ingest::PUSH_PATH, any(ingest::push))
}
