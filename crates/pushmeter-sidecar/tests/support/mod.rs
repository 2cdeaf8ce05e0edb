//! Test doubles shared by the sidecar integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pushmeter_core::error::{PushmeterError, Result};
use pushmeter_sidecar::config::SidecarConfig;
use pushmeter_sidecar::telemetry::{CounterPipeline, ErrorSink, MetricReporter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Record(i64),
    Shutdown,
}

/// In-memory pipeline: keeps the running counter value and an event log.
#[derive(Default)]
pub struct RecordingPipeline {
    events: Mutex<Vec<Event>>,
    record_delay: Option<Duration>,
    shutdown_delay: Option<Duration>,
}

impl RecordingPipeline {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_record_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            record_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn with_shutdown_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            shutdown_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn value(&self) -> i64 {
        self.events()
            .iter()
            .map(|e| match e {
                Event::Record(d) => *d,
                Event::Shutdown => 0,
            })
            .sum()
    }

    pub fn records(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Record(_)))
            .count()
    }

    pub fn shutdowns(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Shutdown))
            .count()
    }
}

#[async_trait]
impl CounterPipeline for RecordingPipeline {
    async fn record(&self, delta: i64) -> Result<()> {
        if let Some(d) = self.record_delay {
            tokio::time::sleep(d).await;
        }
        self.events.lock().unwrap().push(Event::Record(delta));
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.events.lock().unwrap().push(Event::Shutdown);
        if let Some(d) = self.shutdown_delay {
            tokio::time::sleep(d).await;
        }
        Ok(())
    }
}

/// Pipeline whose every operation fails.
pub struct FailingPipeline;

#[async_trait]
impl CounterPipeline for FailingPipeline {
    async fn record(&self, _delta: i64) -> Result<()> {
        Err(PushmeterError::Export("collector rejected batch".into()))
    }

    async fn shutdown(&self) -> Result<()> {
        Err(PushmeterError::Export("final flush failed".into()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    errors: Mutex<Vec<PushmeterError>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn errors(&self) -> Vec<PushmeterError> {
        self.errors.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingSink {
    fn emit(&self, err: &PushmeterError) {
        self.errors.lock().unwrap().push(err.clone());
    }
}

pub const REPORT_TIMEOUT: Duration = Duration::from_secs(3);

pub fn reporter(pipeline: Arc<RecordingPipeline>, sink: Arc<RecordingSink>) -> Arc<MetricReporter> {
    Arc::new(MetricReporter::with_pipeline(pipeline, sink, REPORT_TIMEOUT))
}

/// Smallest valid cadence, short grace period, probe off.
pub fn fast_config() -> SidecarConfig {
    let mut cfg = SidecarConfig::default();
    cfg.telemetry.service_name = "pushmeter-test".into();
    cfg.telemetry.cadence_ms = 1_000;
    cfg.telemetry.report_timeout_ms = 500;
    cfg.telemetry.probe_collector = false;
    cfg.server.listen = "127.0.0.1:0".into();
    cfg.shutdown.grace_period_ms = 1_000;
    cfg
}
