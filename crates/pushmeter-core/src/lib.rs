//! pushmeter core: runtime-free contracts shared by the sidecar and tooling.
//!
//! This crate defines the error taxonomy and the process lifecycle state
//! machine. It carries no transport, runtime, or telemetry SDK dependencies so
//! the contracts can be tested and reused without a tokio runtime.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PushmeterError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod lifecycle;

/// Shared result type.
pub use error::{ErrorCode, PushmeterError, Result};
pub use lifecycle::LifecycleState;
