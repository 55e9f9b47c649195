//! Run-wide configuration model.
//!
//! An explicit immutable configuration structure threaded through the
//! pipeline entry point. Nothing in the search loop reads process-wide
//! mutable state, so the controller stays independently testable.

use serde::{Deserialize, Serialize};

use super::task::MetricDirection;

/// Main configuration structure for Crucible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Task configuration
    #[serde(default)]
    pub task: TaskConfig,

    /// Search loop configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Sandbox execution configuration
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Code-synthesis oracle configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Task configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskConfig {
    /// Task name; must match a folder under `data_dir`
    #[serde(default = "default_task_name")]
    pub name: String,

    /// Evaluation metric name (informational, passed to the oracle)
    #[serde(default = "default_metric")]
    pub metric: String,

    /// Metric direction: minimize or maximize
    #[serde(default)]
    pub direction: MetricDirection,

    /// Directory containing task datasets
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory for per-artifact working directories and run outputs
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,
}

fn default_task_name() -> String {
    "california-housing-prices".to_string()
}

fn default_metric() -> String {
    "rmse".to_string()
}

fn default_data_dir() -> String {
    "./tasks".to_string()
}

fn default_workspace_dir() -> String {
    "./workspace".to_string()
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: default_task_name(),
            metric: default_metric(),
            direction: MetricDirection::default(),
            data_dir: default_data_dir(),
            workspace_dir: default_workspace_dir(),
        }
    }
}

/// Search loop configuration: round counts and retry/concurrency bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Number of independent seed solutions requested at initialization
    #[serde(default = "default_num_seed_solutions")]
    pub num_seed_solutions: usize,

    /// Outer refinement rounds (one ablation + mutation target per round)
    #[serde(default = "default_outer_loop_rounds")]
    pub outer_loop_rounds: u32,

    /// Competing improvement attempts per outer round
    #[serde(default = "default_inner_loop_rounds")]
    pub inner_loop_rounds: usize,

    /// Ensemble combination-strategy rounds
    #[serde(default = "default_ensemble_loop_rounds")]
    pub ensemble_loop_rounds: u32,

    /// Candidates handed to the ensemble composer
    #[serde(default = "default_ensemble_top_k")]
    pub ensemble_top_k: usize,

    /// Maximum oracle-driven repair attempts per failed execution
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: u32,

    /// Maximum sandbox executions running concurrently
    #[serde(default = "default_max_concurrent_executions")]
    pub max_concurrent_executions: usize,
}

const fn default_num_seed_solutions() -> usize {
    2
}

const fn default_outer_loop_rounds() -> u32 {
    2
}

const fn default_inner_loop_rounds() -> usize {
    2
}

const fn default_ensemble_loop_rounds() -> u32 {
    2
}

const fn default_ensemble_top_k() -> usize {
    3
}

const fn default_max_repair_attempts() -> u32 {
    3
}

const fn default_max_concurrent_executions() -> usize {
    2
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_seed_solutions: default_num_seed_solutions(),
            outer_loop_rounds: default_outer_loop_rounds(),
            inner_loop_rounds: default_inner_loop_rounds(),
            ensemble_loop_rounds: default_ensemble_loop_rounds(),
            ensemble_top_k: default_ensemble_top_k(),
            max_repair_attempts: default_max_repair_attempts(),
            max_concurrent_executions: default_max_concurrent_executions(),
        }
    }
}

/// Sandbox execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SandboxConfig {
    /// Interpreter used to run generated artifacts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Hard wall-clock timeout per execution, in seconds
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

const fn default_exec_timeout_secs() -> u64 {
    600
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            exec_timeout_secs: default_exec_timeout_secs(),
        }
    }
}

/// Code-synthesis oracle configuration (OpenRouter-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// API key; usually supplied via `CRUCIBLE_ORACLE__API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum retries for transient oracle failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum retry backoff, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Request rate limit, requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "anthropic/claude-3.5-sonnet".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    120
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    2_000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

const fn default_requests_per_second() -> f64 {
    1.0
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file; stderr only when unset
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_knobs() {
        let config = Config::default();
        assert_eq!(config.search.outer_loop_rounds, 2);
        assert_eq!(config.search.inner_loop_rounds, 2);
        assert_eq!(config.search.ensemble_loop_rounds, 2);
        assert_eq!(config.search.max_repair_attempts, 3);
        assert_eq!(config.sandbox.exec_timeout_secs, 600);
        assert_eq!(config.task.direction, MetricDirection::Minimize);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("search:\n  outer_loop_rounds: 5\n").unwrap();
        assert_eq!(config.search.outer_loop_rounds, 5);
        assert_eq!(config.search.inner_loop_rounds, 2);
        assert_eq!(config.sandbox.interpreter, "python3");
    }
}
