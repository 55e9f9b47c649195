//! Code-synthesis oracle port.
//!
//! The oracle is the external service the controller queries for new or
//! repaired code. It is abstracted behind a single capability interface so
//! the controller's correctness never depends on prompt wording or model
//! choice, and a deterministic stub can stand in during tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{MetricDirection, TaskSpec};

/// What kind of code the oracle is being asked to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalKind {
    /// An independent baseline solution from scratch.
    Seed,
    /// An improvement of `base_code` focused on one region.
    Improve {
        /// Full source of the current best solution.
        base_code: String,
        /// Region to mutate; the rest of the code should be preserved.
        region: String,
    },
    /// A corrected version of code that failed to execute.
    Repair {
        /// The failing source.
        code: String,
        /// Captured error trace from the sandbox.
        error_trace: String,
    },
    /// A combination strategy (voting/stacking/blending) over candidates.
    Ensemble {
        /// Full sources of the candidate solutions to combine.
        parent_sources: Vec<String>,
        /// Summaries of combination strategies already tried, with scores.
        prior_attempts: Vec<String>,
    },
}

impl ProposalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Improve { .. } => "improve",
            Self::Repair { .. } => "repair",
            Self::Ensemble { .. } => "ensemble",
        }
    }
}

/// Context for one oracle call.
#[derive(Debug, Clone)]
pub struct ProposeRequest {
    /// Task description handed to the oracle verbatim.
    pub task_description: String,
    /// Metric name, e.g. "rmse".
    pub metric: String,
    /// Metric direction.
    pub direction: MetricDirection,
    /// What to produce.
    pub kind: ProposalKind,
    /// Number of independent variants requested.
    pub n_variants: usize,
}

impl ProposeRequest {
    /// Build a request for `task` with `n_variants` of `kind`.
    pub fn new(task: &TaskSpec, kind: ProposalKind, n_variants: usize) -> Self {
        Self {
            task_description: task.description.clone(),
            metric: task.metric.clone(),
            direction: task.direction,
            kind,
            n_variants,
        }
    }
}

/// Errors surfaced by an oracle implementation.
///
/// All variants are recovered locally by the controller: transient
/// failures are retried with backoff inside the client, and anything that
/// still escapes degrades to "no new attempt" for the affected slot.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Network-level failure reaching the oracle.
    #[error("oracle connection error: {0}")]
    Connection(String),

    /// The oracle rejected the request with an HTTP status.
    #[error("oracle returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The call exceeded its time budget.
    #[error("oracle request timed out")]
    Timeout,

    /// The response arrived but could not be interpreted as code.
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    /// Retries were exhausted without a usable response.
    #[error("oracle retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The final error, stringified.
        last_error: String,
    },
}

impl OracleError {
    /// Whether retrying this error may help.
    ///
    /// Rate limits and server-side errors are transient; client errors
    /// (4xx other than 429) and malformed responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) | Self::RetriesExhausted { .. } => false,
        }
    }
}

/// Port for the external code-synthesis service.
#[async_trait]
pub trait SynthesisOracle: Send + Sync {
    /// Request `n_variants` independent code strings for the given context.
    ///
    /// Implementations may return fewer variants than requested when some
    /// calls fail; an empty vector is an error, not a valid response.
    async fn propose(&self, request: ProposeRequest) -> Result<Vec<String>, OracleError>;
}
