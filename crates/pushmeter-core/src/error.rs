//! Shared error type across pushmeter crates.

use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Stable error codes, used in structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Export pipeline or instrument could not be built.
    Initialization,
    /// A measurement failed to send or flush.
    Export,
    /// Final flush did not finish within the grace period.
    ShutdownTimeout,
    /// Invalid or unreadable configuration.
    Config,
    /// Lifecycle state machine misuse.
    InvalidTransition,
    /// HTTP listener failed to bind or serve.
    Server,
}

impl ErrorCode {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Initialization => "INITIALIZATION",
            ErrorCode::Export => "EXPORT",
            ErrorCode::ShutdownTimeout => "SHUTDOWN_TIMEOUT",
            ErrorCode::Config => "CONFIG",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::Server => "SERVER",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PushmeterError>;

/// Unified error type used by core and sidecar.
///
/// `Clone` so a settled shutdown outcome can be handed out more than once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushmeterError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("export failed: {0}")]
    Export(String),
    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
    #[error("server error: {0}")]
    Server(String),
}

impl PushmeterError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PushmeterError::Initialization(_) => ErrorCode::Initialization,
            PushmeterError::Export(_) => ErrorCode::Export,
            PushmeterError::ShutdownTimeout(_) => ErrorCode::ShutdownTimeout,
            PushmeterError::Config(_) => ErrorCode::Config,
            PushmeterError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            PushmeterError::Server(_) => ErrorCode::Server,
        }
    }

    /// Whether the error must stop the process at startup.
    ///
    /// Steady-state failures (export, shutdown timeout, server) are logged and
    /// swallowed; only a sidecar that cannot be built is fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PushmeterError::Initialization(_) | PushmeterError::Config(_)
        )
    }
}
