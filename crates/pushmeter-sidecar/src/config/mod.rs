//! Sidecar config loader (strict parsing + env overrides).

pub mod schema;

use std::fs;

use pushmeter_core::error::{PushmeterError, Result};

pub use schema::{ServerSection, ShutdownSection, SidecarConfig, TelemetrySection};

/// Env var naming the YAML config file when no CLI argument is given.
pub const CONFIG_PATH_ENV: &str = "PUSHMETER_CONFIG";

pub fn load_from_file(path: &str) -> Result<SidecarConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PushmeterError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SidecarConfig> {
    let cfg: SidecarConfig = serde_yaml::from_str(s)
        .map_err(|e| PushmeterError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load the effective config: the YAML file when a path is given, built-in
/// defaults otherwise, then `ENV_*` overrides from the process environment.
pub fn load(path: Option<&str>) -> Result<SidecarConfig> {
    let mut cfg = match path {
        Some(p) => load_from_file(p)?,
        None => SidecarConfig::default(),
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;
    Ok(cfg)
}
