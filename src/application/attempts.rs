//! Attempt evaluation: bounded-concurrency execution with repair.
//!
//! One "attempt" is a candidate artifact taken through the sandbox and,
//! on any non-success, through the debug/repair subloop. Permits from a
//! shared semaphore bound how many sandbox runs are in flight at once;
//! a permit is held across an attempt's repair re-executions too, so the
//! configured execution concurrency is a true ceiling.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::models::{
    AttemptRecord, CodeArtifact, ExecutionResult, MetricDirection, TaskSpec,
};
use crate::domain::ports::ArtifactExecutor;

use super::repair::RepairLoop;

/// Final state of one evaluated attempt.
pub struct EvaluatedAttempt {
    /// Superseded artifacts: the original when repair replaced it, plus
    /// every failed repair candidate, kept so the pool retains each
    /// attempted variant.
    pub superseded: Vec<(CodeArtifact, ExecutionResult)>,
    /// The attempt's final artifact (repaired version if repair ran).
    pub artifact: CodeArtifact,
    /// The final execution result.
    pub result: ExecutionResult,
    /// Oracle calls spent on repair.
    pub repair_attempts: u32,
}

impl EvaluatedAttempt {
    /// Round-history record for this attempt.
    pub fn record(&self) -> AttemptRecord {
        AttemptRecord {
            artifact_id: self.artifact.id,
            status: self.result.status,
            score: self.result.score,
            repair_attempts: self.repair_attempts,
        }
    }
}

/// Executes attempts under a shared concurrency bound, repairing failures.
pub struct AttemptRunner {
    executor: Arc<dyn ArtifactExecutor>,
    repair: RepairLoop,
    semaphore: Arc<Semaphore>,
}

impl AttemptRunner {
    /// Create a runner sharing `semaphore` across all stages of the run.
    pub fn new(
        executor: Arc<dyn ArtifactExecutor>,
        repair: RepairLoop,
        semaphore: Arc<Semaphore>,
    ) -> Self {
        Self {
            executor,
            repair,
            semaphore,
        }
    }

    /// Execute `artifact`, routing any non-success through repair.
    pub async fn evaluate(&self, task: &TaskSpec, artifact: CodeArtifact) -> EvaluatedAttempt {
        // Semaphore only closes on explicit close(), which never happens.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("execution semaphore closed");

        let result = self.executor.execute(&artifact).await;
        debug!(
            artifact_id = %artifact.id,
            status = result.status.as_str(),
            "attempt executed"
        );

        if result.is_success() {
            return EvaluatedAttempt {
                superseded: Vec::new(),
                artifact,
                result,
                repair_attempts: 0,
            };
        }

        let report = self.repair.repair(task, &artifact, &result).await;
        match report.fixed {
            Some((fixed, fixed_result)) => {
                let mut superseded = vec![(artifact, result)];
                superseded.extend(report.discarded);
                EvaluatedAttempt {
                    superseded,
                    artifact: fixed,
                    result: fixed_result,
                    repair_attempts: report.oracle_calls,
                }
            }
            None => EvaluatedAttempt {
                superseded: report.discarded,
                artifact,
                result,
                repair_attempts: report.oracle_calls,
            },
        }
    }
}

/// Pick the winning attempt among `attempts`, which must be in generation
/// order. Returns `(index, score)` of the best-scoring successful attempt.
///
/// Ties keep the earliest attempt, so the choice depends only on scores
/// and generation order, never on execution completion order.
pub fn select_best(attempts: &[EvaluatedAttempt], direction: MetricDirection) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, attempt) in attempts.iter().enumerate() {
        let Some(score) = attempt.result.score else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, incumbent)) => direction.improves(score, incumbent),
        };
        if better {
            best = Some((index, score));
        }
    }
    best
}
