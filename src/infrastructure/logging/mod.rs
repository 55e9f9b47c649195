//! Logging initialization using tracing.

use std::io;

use anyhow::{bail, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::domain::models::LoggingConfig;

/// Initialized logger; hold the returned guard for the process lifetime
/// so buffered file output is flushed on shutdown.
pub struct Logger {
    _guard: Option<WorkerGuard>,
}

impl Logger {
    /// Initialize the global tracing subscriber from configuration.
    ///
    /// Logs go to stderr (pretty or json per config), plus a JSON file
    /// layer when a log file is configured. `RUST_LOG` overrides the
    /// configured level.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();

        let guard = if let Some(ref path) = config.file {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);

            if config.format == "json" {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(file_layer)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(file_layer)
                    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                    .init();
            }
            Some(guard)
        } else {
            if config.format == "json" {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                    .init();
            }
            None
        };

        Ok(Self { _guard: guard })
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => bail!("invalid log level: {other}"),
    }
}
