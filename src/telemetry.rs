//! Structured logging setup.
//!
//! Events go through an [`EnvFilter`] (level from config, `RUST_LOG` wins when
//! set), a [`SamplingLayer`] that can thin out low-severity events, and a JSON or
//! pretty `fmt` layer. With `async_logging` the writer is a
//! `tracing_appender` non-blocking stdout whose [`WorkerGuard`] must be held
//! until exit so buffered lines are flushed.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SamplingMode {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "error-only", alias = "error_only")]
    ErrorOnly,
    #[serde(rename = "sampled")]
    Sampled,
}

impl SamplingMode {
    /// Unknown values fall back to `Sampled`.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "all" => SamplingMode::All,
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            _ => SamplingMode::Sampled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction of sub-WARN events kept in `Sampled` mode.
    pub sampling_rate: f64,
    pub async_logging: bool,
    /// Lines buffered by the non-blocking writer before new ones are dropped.
    pub buffer_size: usize,
    /// Extra comma-separated `EnvFilter` directives, e.g. `items_api::router=debug`.
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: true,
            buffer_size: 8192,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    pub fn default_dev() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            buffer_size: 1024,
            include_location: true,
            ..Self::default()
        }
    }

    pub fn default_prod() -> Self {
        Self {
            sampling_mode: SamplingMode::Sampled,
            sampling_rate: 0.1,
            ..Self::default()
        }
    }

    fn level(&self) -> Level {
        match self.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Drops events according to a [`SamplingMode`]. WARN and ERROR always pass.
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, level: &Level) -> bool {
        let important = matches!(*level, Level::WARN | Level::ERROR);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => important,
            SamplingMode::Sampled => {
                if important {
                    return true;
                }
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                let interval = (1.0 / self.sampling_rate).round().max(1.0) as u64;
                count % interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        // Spans are never sampled away, only events.
        !metadata.is_event() || self.should_sample(metadata.level())
    }
}

/// Build the filter; returns the directives that failed to parse.
fn build_filter(config: &LogConfig) -> (EnvFilter, Vec<String>) {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));
    let mut invalid = Vec::new();

    if let Ok(directive) = "may_minihttp::http_server=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if let Some(target_filter) = &config.target_filter {
        for filter in target_filter.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match filter.parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(_) => invalid.push(filter.to_string()),
            }
        }
    }
    (env_filter, invalid)
}

/// Install the global subscriber.
///
/// Returns the writer guard in async mode; dropping it flushes and stops the
/// background writer.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (env_filter, invalid) = build_filter(config);
    let sampling_layer = SamplingLayer::new(config.sampling_mode, config.sampling_rate);

    let (writer, guard) = if config.async_logging {
        let (nb, guard) = NonBlockingBuilder::default()
            .buffered_lines_limit(config.buffer_size)
            .finish(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(nb), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(sampling_layer)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    for directive in invalid {
        tracing::warn!(directive = %directive, "Ignoring invalid log filter directive");
    }
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default_dev() {
        let config = LogConfig::default_dev();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.sampling_mode, SamplingMode::All);
        assert!(!config.async_logging);
        assert!(config.include_location);
    }

    #[test]
    fn test_log_config_default_prod() {
        let config = LogConfig::default_prod();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.sampling_mode, SamplingMode::Sampled);
        assert_eq!(config.sampling_rate, 0.1);
        assert!(config.async_logging);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_sampling_mode_parse() {
        assert_eq!(SamplingMode::parse("all"), SamplingMode::All);
        assert_eq!(SamplingMode::parse("error-only"), SamplingMode::ErrorOnly);
        assert_eq!(SamplingMode::parse("error_only"), SamplingMode::ErrorOnly);
        assert_eq!(SamplingMode::parse("whatever"), SamplingMode::Sampled);
    }

    #[test]
    fn test_log_config_from_yaml() {
        let config: LogConfig =
            serde_yaml::from_str("level: warn\nformat: pretty\nsampling_mode: error-only\n").unwrap();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.sampling_mode, SamplingMode::ErrorOnly);
        assert_eq!(config.buffer_size, 8192);
    }

    #[test]
    fn test_sampling_layer_modes() {
        let all = SamplingLayer::new(SamplingMode::All, 0.0);
        assert!(all.should_sample(&Level::DEBUG));

        let errors = SamplingLayer::new(SamplingMode::ErrorOnly, 1.0);
        assert!(errors.should_sample(&Level::ERROR));
        assert!(errors.should_sample(&Level::WARN));
        assert!(!errors.should_sample(&Level::INFO));

        let half = SamplingLayer::new(SamplingMode::Sampled, 0.5);
        let kept = (0..10).filter(|_| half.should_sample(&Level::INFO)).count();
        assert_eq!(kept, 5);
        assert!(half.should_sample(&Level::ERROR));
    }

    #[test]
    fn test_invalid_target_filter_reported() {
        let config = LogConfig {
            target_filter: Some("items_api=debug, items_api=loud, ".to_string()),
            ..LogConfig::default()
        };
        let (_, invalid) = build_filter(&config);
        assert_eq!(invalid, vec!["items_api=loud".to_string()]);
    }
}
