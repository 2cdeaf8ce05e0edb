//! pushmeter sidecar
//!
//! - Pushes one up/down counter (+1 per cadence) to an OTLP collector
//! - Ingestion endpoint: ANY /api/v1/push -> 200
//! - SIGINT/SIGTERM -> stop ticker, final flush within the grace period

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use pushmeter_core::error::Result;
use pushmeter_sidecar::config;
use pushmeter_sidecar::supervisor::Supervisor;
use pushmeter_sidecar::telemetry::LogErrorSink;

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "pushmeter exited");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // First CLI arg wins over PUSHMETER_CONFIG; neither means defaults + env.
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(config::CONFIG_PATH_ENV).ok());
    let cfg = config::load(path.as_deref())?;

    tracing::info!(
        scope = %cfg.telemetry.scope_name,
        service = %cfg.telemetry.service_name,
        endpoint = %cfg.telemetry.otel_endpoint,
        "effective telemetry settings"
    );

    let supervisor = Supervisor::start(cfg, Arc::new(LogErrorSink)).await?;
    let summary = supervisor.run().await?;

    tracing::info!(
        reports = summary.reports_fired,
        clean = summary.shutdown_error.is_none(),
        "pushmeter stopped"
    );
    Ok(())
}
