//! Log output setup.
//!
//! The library itself only emits `tracing` events. Binaries embedding the
//! runner call [`init_tracing`] once at startup to get them on stderr.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,reelflow=debug";

/// Shape of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::invalid(
                "log_format",
                format!("unknown format '{other}' (expected pretty or json)"),
            )),
        }
    }
}

/// Builds the filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Builds a fmt subscriber writing to `writer`, without installing it.
#[must_use]
pub fn subscriber<W>(
    format: LogFormat,
    filter: EnvFilter,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    match format {
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
        LogFormat::Json => Box::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .finish(),
        ),
    }
}

/// Installs the global subscriber, logging to stderr.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    subscriber(format, env_filter(), std::io::stderr).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LogCapture;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_json_subscriber_flattens_fields() {
        let capture = LogCapture::new();
        let subscriber = subscriber(LogFormat::Json, EnvFilter::new("info"), capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(run_id = "run-1", attempt = 2_u64, "Pipeline started");
            tracing::debug!("filtered out");
        });

        let lines = capture.json_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "Pipeline started");
        assert_eq!(lines[0]["run_id"], "run-1");
        assert_eq!(lines[0]["attempt"], 2);
    }

    #[test]
    fn test_pretty_subscriber_respects_filter() {
        let capture = LogCapture::new();
        let subscriber = subscriber(LogFormat::Pretty, EnvFilter::new("warn"), capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("hidden");
            tracing::warn!("Step aborted");
        });

        let output = capture.contents();
        assert!(output.contains("Step aborted"));
        assert!(!output.contains("hidden"));
    }
}
