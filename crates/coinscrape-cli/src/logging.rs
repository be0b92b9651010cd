//! Subscriber setup for the `coinscrape` binary.
//!
//! `RUST_LOG` wins over `--log-level` when set. Logs always go to stderr so
//! that stdout carries only the price table or JSON.

use std::io::Write;

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset (e.g. `info`, `coinscrape=debug`).
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    pub fn new(format: LogFormat, default_level: impl Into<String>) -> Self {
        Self {
            format,
            default_level: default_level.into(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// Marks the end of the process's logging lifetime.
///
/// Log events are written synchronously to unbuffered stderr, so there is
/// nothing to drain. Dropping the guard logs the shutdown and flushes stdout,
/// where result output goes.
#[must_use = "dropping the guard marks logging teardown"]
#[derive(Debug)]
pub struct LogGuard {
    _private: (),
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        tracing::debug!("Shutting down");
        let _ = std::io::stdout().flush();
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(config: LogConfig) -> anyhow::Result<LogGuard> {
    let filter = config.filter();

    let result = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    result.map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    Ok(LogGuard { _private: () })
}
