//! OTLP/gRPC export pipeline (insecure transport, periodic push).

use std::time::Duration;

use async_trait::async_trait;
use axum::http::Uri;
use opentelemetry::metrics::{MeterProvider, UpDownCounter};
use opentelemetry::{InstrumentationScope, KeyValue};
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::{runtime, Resource};
use tokio::net::TcpStream;

use pushmeter_core::error::{PushmeterError, Result};

use crate::telemetry::reporter::{CounterPipeline, ReporterOptions};

/// Used when no collector endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4317";
pub const COUNTER_UNIT: &str = "count";

const RESOURCE_SERVICE_NAME: &str = "service.name";
const RESOURCE_SERVICE_VERSION: &str = "service.version";
const MAX_INSTRUMENT_NAME_LEN: usize = 255;

/// A collector address that passed normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorEndpoint {
    /// `http://host:port`, as handed to the gRPC channel.
    pub url: String,
    pub host: String,
    pub port: u16,
}

/// Accepts `host:port` or `http://host:port`. Only plain http is allowed.
pub fn normalize_endpoint(raw: &str) -> Result<CollectorEndpoint> {
    let raw = raw.trim();
    let candidate = if raw.is_empty() {
        DEFAULT_ENDPOINT.to_owned()
    } else if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("http://{raw}")
    };

    let uri: Uri = candidate.parse().map_err(|e| {
        PushmeterError::Initialization(format!("malformed collector endpoint {raw:?}: {e}"))
    })?;

    if uri.scheme_str() != Some("http") {
        return Err(PushmeterError::Initialization(format!(
            "collector endpoint {raw:?} must use insecure http"
        )));
    }

    let authority = uri.authority().ok_or_else(|| {
        PushmeterError::Initialization(format!("collector endpoint {raw:?} has no host"))
    })?;
    let host = authority
        .host()
        .trim_start_matches('[')
        .trim_end_matches(']');
    if host.is_empty() {
        return Err(PushmeterError::Initialization(format!(
            "collector endpoint {raw:?} has no host"
        )));
    }

    Ok(CollectorEndpoint {
        url: format!("http://{}", authority.as_str()),
        host: host.to_owned(),
        port: authority.port_u16().unwrap_or(80),
    })
}

/// OpenTelemetry instrument name rules. The SDK swaps an invalid name for a
/// no-op instrument, so it has to be caught here.
fn validate_instrument_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PushmeterError::Initialization(
            "instrument name must not be empty".into(),
        ));
    }
    let mut chars = name.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'));
    if name.len() > MAX_INSTRUMENT_NAME_LEN || !first_ok || !rest_ok {
        return Err(PushmeterError::Initialization(format!(
            "invalid instrument name {name:?}"
        )));
    }
    Ok(())
}

fn warn_on_empty(opts: &ReporterOptions) {
    for (field, value) in [
        ("scope", &opts.scope),
        ("service_name", &opts.service_name),
        ("service_version", &opts.service_version),
    ] {
        if value.is_empty() {
            tracing::warn!(field, "empty telemetry label; exported data will be unlabeled");
        }
    }
}

async fn probe(endpoint: &CollectorEndpoint, timeout: Duration) -> Result<()> {
    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(PushmeterError::Initialization(format!(
            "collector {} unreachable: {e}",
            endpoint.url
        ))),
        Err(_) => Err(PushmeterError::Initialization(format!(
            "collector {} did not accept a connection within {timeout:?}",
            endpoint.url
        ))),
    }
}

fn resource(opts: &ReporterOptions) -> Resource {
    Resource::default().merge(&Resource::new([
        KeyValue::new(RESOURCE_SERVICE_NAME, opts.service_name.clone()),
        KeyValue::new(RESOURCE_SERVICE_VERSION, opts.service_version.clone()),
    ]))
}

pub struct OtlpPipeline {
    provider: SdkMeterProvider,
    counter: UpDownCounter<i64>,
}

impl OtlpPipeline {
    /// Build the OTLP exporter and register the counter on top of it.
    pub async fn connect(opts: &ReporterOptions) -> Result<Self> {
        validate_instrument_name(&opts.metric_name)?;

        let endpoint = normalize_endpoint(&opts.collector_endpoint)?;
        if let Some(timeout) = opts.probe_timeout {
            probe(&endpoint, timeout).await?;
        }

        let exporter = MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.url.clone())
            .with_timeout(opts.report_timeout)
            .build()
            .map_err(|e| PushmeterError::Initialization(format!("otlp exporter: {e}")))?;

        let pipeline = Self::with_exporter(opts, exporter)?;
        tracing::info!(endpoint = %endpoint.url, "otlp pipeline ready");
        Ok(pipeline)
    }

    /// Periodic reader, provider, resource and counter over any push exporter.
    pub fn with_exporter<E>(opts: &ReporterOptions, exporter: E) -> Result<Self>
    where
        E: PushMetricExporter,
    {
        warn_on_empty(opts);
        validate_instrument_name(&opts.metric_name)?;

        let reader = PeriodicReader::builder(exporter, runtime::Tokio)
            .with_interval(opts.cadence)
            .build();

        let provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource(opts))
            .build();

        let scope = InstrumentationScope::builder(opts.scope.clone())
            .with_version(opts.service_version.clone())
            .build();
        let counter = provider
            .meter_with_scope(scope)
            .i64_up_down_counter(opts.metric_name.clone())
            .with_unit(COUNTER_UNIT)
            .build();

        tracing::debug!(
            scope = %opts.scope,
            metric = %opts.metric_name,
            cadence = ?opts.cadence,
            "counter registered"
        );

        Ok(Self { provider, counter })
    }

    /// Collect and export now, outside the cadence.
    pub async fn force_flush(&self) -> Result<()> {
        let provider = self.provider.clone();
        tokio::task::spawn_blocking(move || provider.force_flush())
            .await
            .map_err(|e| PushmeterError::Export(format!("flush task failed: {e}")))?
            .map_err(|e| PushmeterError::Export(format!("flush failed: {e}")))
    }
}

#[async_trait]
impl CounterPipeline for OtlpPipeline {
    async fn record(&self, delta: i64) -> Result<()> {
        self.counter.add(delta, &[]);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        // SDK shutdown blocks on the reader's final collect + export.
        let provider = self.provider.clone();
        tokio::task::spawn_blocking(move || provider.shutdown())
            .await
            .map_err(|e| PushmeterError::Export(format!("shutdown task failed: {e}")))?
            .map_err(|e| PushmeterError::Export(format!("final flush failed: {e}")))
    }
}
