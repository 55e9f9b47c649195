//! Debug/repair subloop: turns an execution failure into a corrected
//! artifact under a bounded number of oracle calls.
//!
//! Each repair attempt sends the failing code and its error trace to the
//! oracle, executes the corrected artifact under the same sandbox rules as
//! any other run, and either returns the first success or gives up once
//! the attempt budget is spent. Exhaustion marks the original attempt as
//! permanently failed for its round; it never aborts the pipeline.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::models::{CodeArtifact, ExecutionResult, TaskSpec};
use crate::domain::ports::{ArtifactExecutor, ProposalKind, ProposeRequest, SynthesisOracle};

/// Everything one repair invocation produced.
///
/// Failed intermediate candidates are reported alongside the fix so the
/// pool can retain every executed variant; the subloop itself discards
/// nothing.
pub struct RepairReport {
    /// Corrected artifact and its successful result, when repair worked.
    pub fixed: Option<(CodeArtifact, ExecutionResult)>,
    /// Executed repair candidates that still failed, in attempt order.
    pub discarded: Vec<(CodeArtifact, ExecutionResult)>,
    /// Oracle calls consumed (including failed repair attempts).
    pub oracle_calls: u32,
}

/// Bounded oracle-driven repair loop.
pub struct RepairLoop {
    oracle: Arc<dyn SynthesisOracle>,
    executor: Arc<dyn ArtifactExecutor>,
    max_attempts: u32,
}

impl RepairLoop {
    /// Create a repair loop with at most `max_attempts` oracle calls per
    /// failed execution.
    pub fn new(
        oracle: Arc<dyn SynthesisOracle>,
        executor: Arc<dyn ArtifactExecutor>,
        max_attempts: u32,
    ) -> Self {
        Self {
            oracle,
            executor,
            max_attempts,
        }
    }

    /// Try to repair `failed` given its `failure` result.
    ///
    /// The report always carries every executed candidate and the oracle
    /// calls consumed, so the round record stays accurate whether or not
    /// a fix was found.
    pub async fn repair(
        &self,
        task: &TaskSpec,
        failed: &CodeArtifact,
        failure: &ExecutionResult,
    ) -> RepairReport {
        let mut current = failed.clone();
        let mut trace = failure.repair_trace();
        let mut calls = 0u32;
        let mut discarded = Vec::new();

        for attempt in 1..=self.max_attempts {
            calls += 1;
            let request = ProposeRequest::new(
                task,
                ProposalKind::Repair {
                    code: current.source.clone(),
                    error_trace: trace.clone(),
                },
                1,
            );

            let source = match self.oracle.propose(request).await {
                Ok(mut variants) if !variants.is_empty() => variants.swap_remove(0),
                Ok(_) => {
                    warn!(artifact_id = %failed.id, attempt, "oracle returned no repair candidate");
                    continue;
                }
                Err(err) => {
                    warn!(artifact_id = %failed.id, attempt, error = %err, "repair oracle call failed");
                    continue;
                }
            };

            let candidate = CodeArtifact::repair(source, &current, attempt);
            let result = self.executor.execute(&candidate).await;
            debug!(
                artifact_id = %candidate.id,
                attempt,
                status = result.status.as_str(),
                "repair attempt executed"
            );

            if result.is_success() {
                return RepairReport {
                    fixed: Some((candidate, result)),
                    discarded,
                    oracle_calls: calls,
                };
            }

            trace = result.repair_trace();
            current = candidate.clone();
            discarded.push((candidate, result));
        }

        warn!(
            artifact_id = %failed.id,
            attempts = calls,
            "repair budget exhausted; attempt recorded as permanently failed"
        );
        RepairReport {
            fixed: None,
            discarded,
            oracle_calls: calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::MetricDirection;
    use crate::domain::ports::OracleError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct QueueOracle {
        responses: Mutex<Vec<Result<Vec<String>, OracleError>>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SynthesisOracle for QueueOracle {
        async fn propose(&self, _request: ProposeRequest) -> Result<Vec<String>, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().remove(0)
        }
    }

    /// Executor that succeeds only when the source contains "fixed".
    struct MarkerExecutor;

    #[async_trait]
    impl ArtifactExecutor for MarkerExecutor {
        async fn execute(&self, artifact: &CodeArtifact) -> ExecutionResult {
            if artifact.source.contains("fixed") {
                ExecutionResult::succeeded(
                    artifact.id,
                    0.17,
                    String::new(),
                    String::new(),
                    Duration::ZERO,
                )
            } else {
                ExecutionResult::failed(
                    artifact.id,
                    "still broken".into(),
                    String::new(),
                    String::new(),
                    Duration::ZERO,
                )
            }
        }
    }

    fn task() -> TaskSpec {
        TaskSpec::new("t", "rmse", MetricDirection::Minimize)
    }

    fn failed_pair() -> (CodeArtifact, ExecutionResult) {
        let artifact = CodeArtifact::seed("broken");
        let result = ExecutionResult::failed(
            artifact.id,
            "TypeError".into(),
            String::new(),
            String::new(),
            Duration::ZERO,
        );
        (artifact, result)
    }

    #[tokio::test]
    async fn test_repair_succeeds_on_second_attempt() {
        let oracle = Arc::new(QueueOracle {
            responses: Mutex::new(vec![
                Ok(vec!["still broken v2".to_string()]),
                Ok(vec!["fixed v3".to_string()]),
            ]),
            calls: AtomicU32::new(0),
        });
        let repair = RepairLoop::new(oracle.clone(), Arc::new(MarkerExecutor), 3);
        let (artifact, failure) = failed_pair();

        let report = repair.repair(&task(), &artifact, &failure).await;
        let (fixed, result) = report.fixed.expect("repair should succeed");
        assert_eq!(result.score, Some(0.17));
        assert_eq!(report.oracle_calls, 2);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
        // The failed first attempt is retained, not dropped.
        assert_eq!(report.discarded.len(), 1);
        assert_eq!(report.discarded[0].0.source, "still broken v2");
        assert!(!report.discarded[0].1.is_success());
        // Lineage chains through the intermediate failed repair.
        assert!(fixed.parent_id.is_some());
    }

    #[tokio::test]
    async fn test_repair_bounded_by_max_attempts() {
        let oracle = Arc::new(QueueOracle {
            responses: Mutex::new(vec![
                Ok(vec!["nope".to_string()]),
                Ok(vec!["nope".to_string()]),
                Ok(vec!["nope".to_string()]),
            ]),
            calls: AtomicU32::new(0),
        });
        let repair = RepairLoop::new(oracle.clone(), Arc::new(MarkerExecutor), 3);
        let (artifact, failure) = failed_pair();

        let report = repair.repair(&task(), &artifact, &failure).await;
        assert!(report.fixed.is_none());
        assert_eq!(report.oracle_calls, 3);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
        // Every executed candidate survives exhaustion.
        assert_eq!(report.discarded.len(), 3);
    }

    #[tokio::test]
    async fn test_oracle_failure_consumes_attempt_without_aborting() {
        let oracle = Arc::new(QueueOracle {
            responses: Mutex::new(vec![
                Err(OracleError::Timeout),
                Ok(vec!["fixed".to_string()]),
            ]),
            calls: AtomicU32::new(0),
        });
        let repair = RepairLoop::new(oracle, Arc::new(MarkerExecutor), 3);
        let (artifact, failure) = failed_pair();

        let report = repair.repair(&task(), &artifact, &failure).await;
        assert!(report.fixed.is_some());
        assert!(report.discarded.is_empty());
        assert_eq!(report.oracle_calls, 2);
    }
}
