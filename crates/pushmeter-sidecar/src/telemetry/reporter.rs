use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use pushmeter_core::error::{PushmeterError, Result};

use crate::config::TelemetrySection;
use crate::telemetry::otlp::OtlpPipeline;
use crate::telemetry::sink::ErrorSink;

/// Attached to every exported measurement as `service.version`.
pub const SERVICE_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// The counter instrument plus whatever carries it to a collector.
#[async_trait]
pub trait CounterPipeline: Send + Sync {
    /// Add `delta` to the counter and hand it to the export pipeline.
    async fn record(&self, delta: i64) -> Result<()>;

    /// Flush buffered measurements and release the export connection.
    async fn shutdown(&self) -> Result<()>;
}

/// Inputs for `MetricReporter::initialize`.
#[derive(Debug, Clone)]
pub struct ReporterOptions {
    pub scope: String,
    pub service_name: String,
    pub service_version: String,
    pub metric_name: String,
    pub collector_endpoint: String,
    pub cadence: Duration,
    pub report_timeout: Duration,
    /// `None` skips the TCP reachability probe.
    pub probe_timeout: Option<Duration>,
}

impl ReporterOptions {
    pub fn from_config(t: &TelemetrySection) -> Self {
        Self {
            scope: t.scope_name.clone(),
            service_name: t.service_name.clone(),
            service_version: SERVICE_VERSION.to_owned(),
            metric_name: t.metric_name.clone(),
            collector_endpoint: t.otel_endpoint.clone(),
            cadence: t.cadence(),
            report_timeout: t.report_timeout(),
            probe_timeout: t.probe_timeout(),
        }
    }
}

/// Owns the single counter and its export pipeline.
///
/// `report` is bounded by `report_timeout`; failures go to the error sink and
/// are never surfaced to the caller. `shutdown` settles once: later calls get
/// the first outcome without touching the pipeline.
pub struct MetricReporter {
    pipeline: Arc<dyn CounterPipeline>,
    errors: Arc<dyn ErrorSink>,
    report_timeout: Duration,
    closed: AtomicBool,
    shutdown_outcome: OnceCell<Result<()>>,
}

impl MetricReporter {
    /// Build the OTLP pipeline and register the counter.
    pub async fn initialize(opts: &ReporterOptions, errors: Arc<dyn ErrorSink>) -> Result<Self> {
        let pipeline = OtlpPipeline::connect(opts).await?;
        Ok(Self::with_pipeline(Arc::new(pipeline), errors, opts.report_timeout))
    }

    pub fn with_pipeline(
        pipeline: Arc<dyn CounterPipeline>,
        errors: Arc<dyn ErrorSink>,
        report_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            errors,
            report_timeout,
            closed: AtomicBool::new(false),
            shutdown_outcome: OnceCell::new(),
        }
    }

    /// Increment the counter by one. Best effort.
    pub async fn report(&self) {
        if self.closed.load(Ordering::Acquire) {
            tracing::debug!("reporter is shut down; measurement dropped");
            return;
        }

        match tokio::time::timeout(self.report_timeout, self.pipeline.record(1)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.errors.emit(&e),
            Err(_) => self.errors.emit(&PushmeterError::Export(format!(
                "report timed out after {:?}",
                self.report_timeout
            ))),
        }
    }

    /// Final flush, bounded by `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.shutdown_outcome
            .get_or_init(|| async {
                self.closed.store(true, Ordering::Release);
                match tokio::time::timeout(timeout, self.pipeline.shutdown()).await {
                    Ok(res) => res,
                    Err(_) => Err(PushmeterError::ShutdownTimeout(timeout)),
                }
            })
            .await
            .clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
