//! Layered application configuration.
//!
//! Precedence, lowest first: built-in defaults, the YAML file, `ITEMS_*`
//! environment variables, then CLI flags (applied by the `serve` command).
//!
//! ```yaml
//! http:
//!   addr: "0.0.0.0:8080"
//!   metrics: true
//! spec:
//!   path: doc/openapi.yaml
//! logging:
//!   level: info
//!   format: json
//! ```

use crate::telemetry::{LogConfig, LogFormat, SamplingMode};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Read when no `--config` is given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
    /// Serve `/metrics` and count requests.
    pub metrics: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            metrics: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpecConfig {
    /// OpenAPI document to serve; the embedded one when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub spec: SpecConfig,
    pub logging: LogConfig,
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        // An empty file is a valid, all-defaults config.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("invalid configuration YAML")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("failed to load config {}", path.display()))
    }

    /// Defaults, overlaid by the YAML file and then the process environment.
    ///
    /// An explicit `path` must exist; otherwise [`DEFAULT_CONFIG_PATH`] is used
    /// only if present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `ITEMS_*` overrides looked up through `lookup`.
    ///
    /// Values that do not parse are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ITEMS_ADDR") {
            self.http.addr = v;
        }
        if let Some(v) = lookup("ITEMS_METRICS").as_deref().and_then(parse_bool) {
            self.http.metrics = v;
        }
        if let Some(v) = lookup("ITEMS_SPEC_PATH") {
            self.spec.path = Some(PathBuf::from(v));
        }

        let log = &mut self.logging;
        if let Some(v) = lookup("ITEMS_LOG_LEVEL") {
            log.level = v;
        }
        if let Some(v) = lookup("ITEMS_LOG_FORMAT") {
            log.format = LogFormat::parse(&v);
        }
        if let Some(v) = lookup("ITEMS_LOG_SAMPLING_MODE") {
            log.sampling_mode = SamplingMode::parse(&v);
        }
        if let Some(v) = lookup("ITEMS_LOG_SAMPLING_RATE").and_then(|s| s.trim().parse().ok()) {
            log.sampling_rate = v;
        }
        if let Some(v) = lookup("ITEMS_LOG_ASYNC").as_deref().and_then(parse_bool) {
            log.async_logging = v;
        }
        if let Some(v) = lookup("ITEMS_LOG_TARGET_FILTER") {
            log.target_filter = Some(v);
        }
        if let Some(v) = lookup("ITEMS_LOG_INCLUDE_LOCATION").as_deref().and_then(parse_bool) {
            log.include_location = v;
        }
    }
}
