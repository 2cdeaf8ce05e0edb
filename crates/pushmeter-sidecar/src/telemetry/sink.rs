//! Error sink for steady-state telemetry failures.

use pushmeter_core::PushmeterError;

/// Receives non-fatal telemetry errors. Never blocks, never retries.
pub trait ErrorSink: Send + Sync {
    fn emit(&self, err: &PushmeterError);
}

/// Default sink: structured `error!` under the `otel` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn emit(&self, err: &PushmeterError) {
        tracing::error!(target: "otel", code = err.code().as_str(), error = %err, "telemetry error");
    }
}
