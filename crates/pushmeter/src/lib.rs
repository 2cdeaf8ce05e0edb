//! Top-level facade crate for pushmeter, the counter-pushing telemetry sidecar.
//!
//! `core` carries the error taxonomy and lifecycle states; `sidecar` carries
//! the reporter, ticker, ingestion endpoint and supervisor.

pub mod core {
    pub use pushmeter_core::*;
}

pub mod sidecar {
    pub use pushmeter_sidecar::*;
}
