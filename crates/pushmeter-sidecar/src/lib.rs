//! pushmeter sidecar library entry.
//!
//! This crate wires the config loader, the counter reporter and its OTLP
//! pipeline, the periodic ticker, and the ingestion endpoint into one
//! supervised process. It is intended to be consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod config;
pub mod ingest;
pub mod router;
pub mod supervisor;
pub mod telemetry;
pub mod ticker;
