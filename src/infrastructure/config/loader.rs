//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration validation error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid outer_loop_rounds: {0}. Must be at least 1")]
    InvalidOuterRounds(u32),

    #[error("invalid inner_loop_rounds: {0}. Must be at least 1")]
    InvalidInnerRounds(usize),

    #[error("invalid num_seed_solutions: {0}. Must be at least 1")]
    InvalidSeedCount(usize),

    #[error("invalid ensemble_top_k: {0}. Must be at least 2")]
    InvalidTopK(usize),

    #[error("invalid max_concurrent_executions: {0}. Must be between 1 and 64")]
    InvalidConcurrency(usize),

    #[error("invalid exec_timeout_secs: {0}. Must be positive")]
    InvalidExecTimeout(u64),

    #[error("interpreter cannot be empty")]
    EmptyInterpreter,

    #[error("task name cannot be empty")]
    EmptyTaskName,

    #[error("invalid requests_per_second: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error(
        "invalid backoff configuration: initial_backoff_ms ({0}) must be <= max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `crucible.yaml` (project config)
    /// 3. Environment variables (`CRUCIBLE_*` prefix, highest priority;
    ///    `__` separates nesting, e.g. `CRUCIBLE_SEARCH__OUTER_LOOP_ROUNDS`)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("crucible.yaml"))
            .merge(Env::prefixed("CRUCIBLE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file (env still applies on top).
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("CRUCIBLE_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.task.name.trim().is_empty() {
            return Err(ConfigError::EmptyTaskName);
        }

        let search = &config.search;
        if search.outer_loop_rounds == 0 {
            return Err(ConfigError::InvalidOuterRounds(search.outer_loop_rounds));
        }
        if search.inner_loop_rounds == 0 {
            return Err(ConfigError::InvalidInnerRounds(search.inner_loop_rounds));
        }
        if search.num_seed_solutions == 0 {
            return Err(ConfigError::InvalidSeedCount(search.num_seed_solutions));
        }
        if search.ensemble_top_k < 2 {
            return Err(ConfigError::InvalidTopK(search.ensemble_top_k));
        }
        if search.max_concurrent_executions == 0 || search.max_concurrent_executions > 64 {
            return Err(ConfigError::InvalidConcurrency(
                search.max_concurrent_executions,
            ));
        }

        if config.sandbox.exec_timeout_secs == 0 {
            return Err(ConfigError::InvalidExecTimeout(
                config.sandbox.exec_timeout_secs,
            ));
        }
        if config.sandbox.interpreter.trim().is_empty() {
            return Err(ConfigError::EmptyInterpreter);
        }

        if config.oracle.requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit(
                config.oracle.requests_per_second,
            ));
        }
        if config.oracle.initial_backoff_ms > config.oracle.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.oracle.initial_backoff_ms,
                config.oracle.max_backoff_ms,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ConfigLoader::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let mut config = Config::default();
        config.search.outer_loop_rounds = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidOuterRounds(0))
        ));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_backoff_ordering_enforced() {
        let mut config = Config::default();
        config.oracle.initial_backoff_ms = 10_000;
        config.oracle.max_backoff_ms = 1_000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(10_000, 1_000))
        ));
    }

    #[test]
    fn test_env_overrides_defaults() {
        temp_env::with_var("CRUCIBLE_SEARCH__OUTER_LOOP_ROUNDS", Some("7"), || {
            let config = ConfigLoader::load().unwrap();
            assert_eq!(config.search.outer_loop_rounds, 7);
        });
    }
}
