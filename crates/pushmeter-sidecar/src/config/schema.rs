use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use pushmeter_core::error::{PushmeterError, Result};

pub const ENV_SCOPE_NAME: &str = "ENV_SCOPE_NAME";
pub const ENV_SERVICE_NAME: &str = "ENV_SERVICE_NAME";
pub const ENV_METRIC_NAME: &str = "ENV_METRIC_NAME";
pub const ENV_OTEL_ENDPOINT: &str = "ENV_OTEL_ENDPOINT";
pub const ENV_LISTEN_ADDR: &str = "ENV_LISTEN_ADDR";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidecarConfig {
    pub version: u32,

    #[serde(default)]
    pub telemetry: TelemetrySection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub shutdown: ShutdownSection,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            version: 1,
            telemetry: TelemetrySection::default(),
            server: ServerSection::default(),
            shutdown: ShutdownSection::default(),
        }
    }
}

impl SidecarConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PushmeterError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.telemetry.validate()?;
        self.server.validate()?;
        self.shutdown.validate()?;

        Ok(())
    }

    /// Override settings from `ENV_*` variables, then re-validate.
    ///
    /// `lookup` returns `None` for unset variables; unset keeps the current value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SCOPE_NAME) {
            self.telemetry.scope_name = v;
        }
        if let Some(v) = lookup(ENV_SERVICE_NAME) {
            self.telemetry.service_name = v;
        }
        if let Some(v) = lookup(ENV_METRIC_NAME) {
            self.telemetry.metric_name = v;
        }
        if let Some(v) = lookup(ENV_OTEL_ENDPOINT) {
            self.telemetry.otel_endpoint = v;
        }
        if let Some(v) = lookup(ENV_LISTEN_ADDR) {
            self.server.listen = v;
        }
        self.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    #[serde(default)]
    pub scope_name: String,

    #[serde(default)]
    pub service_name: String,

    #[serde(default)]
    pub metric_name: String,

    #[serde(default)]
    pub otel_endpoint: String,

    #[serde(default = "default_cadence_ms")]
    pub cadence_ms: u64,

    #[serde(default = "default_report_timeout_ms")]
    pub report_timeout_ms: u64,

    #[serde(default = "default_probe_collector")]
    pub probe_collector: bool,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            scope_name: String::new(),
            service_name: String::new(),
            metric_name: String::new(),
            otel_endpoint: String::new(),
            cadence_ms: default_cadence_ms(),
            report_timeout_ms: default_report_timeout_ms(),
            probe_collector: default_probe_collector(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl TelemetrySection {
    pub fn validate(&self) -> Result<()> {
        if !(1_000..=3_600_000).contains(&self.cadence_ms) {
            return Err(PushmeterError::Config(
                "telemetry.cadence_ms must be between 1000 and 3600000".into(),
            ));
        }
        if !(100..=60_000).contains(&self.report_timeout_ms) {
            return Err(PushmeterError::Config(
                "telemetry.report_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.report_timeout_ms >= self.cadence_ms {
            return Err(PushmeterError::Config(
                "telemetry.report_timeout_ms must be less than cadence_ms".into(),
            ));
        }
        if !(100..=30_000).contains(&self.probe_timeout_ms) {
            return Err(PushmeterError::Config(
                "telemetry.probe_timeout_ms must be between 100 and 30000".into(),
            ));
        }
        Ok(())
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_millis(self.report_timeout_ms)
    }

    /// Probe timeout, or `None` when the reachability probe is disabled.
    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_collector
            .then(|| Duration::from_millis(self.probe_timeout_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Treat a bind/serve failure like a termination signal.
    #[serde(default)]
    pub fail_on_server_error: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            fail_on_server_error: false,
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            PushmeterError::Config(format!(
                "server.listen must be a valid SocketAddr ({}): {e}",
                self.listen
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutdownSection {
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
        }
    }
}

impl ShutdownSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60_000).contains(&self.grace_period_ms) {
            return Err(PushmeterError::Config(
                "shutdown.grace_period_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8001".into()
}
fn default_cadence_ms() -> u64 {
    10_000
}
fn default_report_timeout_ms() -> u64 {
    3_000
}
fn default_probe_collector() -> bool {
    true
}
fn default_probe_timeout_ms() -> u64 {
    2_000
}
fn default_grace_period_ms() -> u64 {
    5_000
}
