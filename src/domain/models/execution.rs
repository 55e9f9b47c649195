//! Execution result domain model.
//!
//! The structured outcome of running one code artifact in the sandbox.
//! Every fault raised by generated code is converted into one of the
//! tagged statuses here; nothing from the sandboxed process ever escapes
//! as an error into the orchestration layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Outcome classification for one sandbox run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Process exited cleanly and emitted a parseable score.
    Succeeded,
    /// Process crashed or exited non-zero.
    Failed,
    /// Process exceeded the wall-clock budget and was killed.
    TimedOut,
    /// Process exited cleanly but no score sentinel was found.
    ScoreUnparseable,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::ScoreUnparseable => "score_unparseable",
        }
    }

    /// Whether this status carries a usable score.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Outcome of running one `CodeArtifact`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Artifact this result describes.
    pub artifact_id: Uuid,
    /// Outcome classification.
    pub status: ExecutionStatus,
    /// Validation score; present only when `status == Succeeded`.
    pub score: Option<f64>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Error trace handed to the repair subloop; present only on failure.
    pub error_trace: Option<String>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl ExecutionResult {
    /// A successful run with a parsed score.
    pub fn succeeded(artifact_id: Uuid, score: f64, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            artifact_id,
            status: ExecutionStatus::Succeeded,
            score: Some(score),
            stdout,
            stderr,
            error_trace: None,
            duration,
        }
    }

    /// A run that crashed or exited non-zero.
    pub fn failed(artifact_id: Uuid, trace: String, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            artifact_id,
            status: ExecutionStatus::Failed,
            score: None,
            stdout,
            stderr,
            error_trace: Some(trace),
            duration,
        }
    }

    /// A run killed at the wall-clock budget.
    pub fn timed_out(artifact_id: Uuid, budget: Duration, stdout: String, stderr: String) -> Self {
        Self {
            artifact_id,
            status: ExecutionStatus::TimedOut,
            score: None,
            stdout,
            stderr,
            error_trace: Some(format!("execution timed out after {}s", budget.as_secs())),
            duration: budget,
        }
    }

    /// A clean exit with no parseable score sentinel in stdout.
    pub fn unparseable(artifact_id: Uuid, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            artifact_id,
            status: ExecutionStatus::ScoreUnparseable,
            score: None,
            stdout,
            stderr,
            error_trace: Some("no score sentinel found in output".to_string()),
            duration,
        }
    }

    /// Whether this result carries a usable score.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Trace text for the repair subloop: error trace, falling back to stderr.
    pub fn repair_trace(&self) -> String {
        match &self.error_trace {
            Some(trace) if !self.stderr.is_empty() => format!("{trace}\n{}", self.stderr),
            Some(trace) => trace.clone(),
            None => self.stderr.clone(),
        }
    }
}
