//! Refinement loop controller.
//!
//! Drives the outer/inner search rounds: each outer round runs an ablation
//! study on the current best artifact, asks the oracle for competing
//! improvement strategies targeting the top-impact region, executes them
//! as one concurrent batch (barrier-synchronized), and applies monotone
//! selection. A round where everything fails is recorded as a no-op and
//! the loop proceeds; the controller never regresses and never aborts on
//! attempt-level failures.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::models::{
    CodeArtifact, RefinementRound, RoundStage, SearchConfig, TaskSpec,
};
use crate::domain::ports::{ProposalKind, ProposeRequest, SynthesisOracle};

use super::ablation::AblationAnalyzer;
use super::attempts::{select_best, AttemptRunner, EvaluatedAttempt};
use super::pool::CandidatePool;

/// Outer/inner round scheduler over the candidate pool.
pub struct RefinementController {
    task: TaskSpec,
    search: SearchConfig,
    oracle: Arc<dyn SynthesisOracle>,
    analyzer: AblationAnalyzer,
    runner: Arc<AttemptRunner>,
}

impl RefinementController {
    /// Create a controller for `task` with the given collaborators.
    pub fn new(
        task: TaskSpec,
        search: SearchConfig,
        oracle: Arc<dyn SynthesisOracle>,
        analyzer: AblationAnalyzer,
        runner: Arc<AttemptRunner>,
    ) -> Self {
        Self {
            task,
            search,
            oracle,
            analyzer,
            runner,
        }
    }

    /// Run `outer_loop_rounds` refinement rounds against the pool.
    ///
    /// Requires a seeded pool; with no current best there is nothing to
    /// refine and the controller returns immediately.
    pub async fn run(&self, pool: &mut CandidatePool) {
        for outer in 0..self.search.outer_loop_rounds {
            let Some(best) = pool.current_best().cloned() else {
                warn!("refinement skipped: pool has no successful candidate");
                return;
            };
            let baseline = pool
                .best_score()
                .expect("best pointer always references a scored artifact");

            info!(
                outer_round = outer + 1,
                total = self.search.outer_loop_rounds,
                baseline,
                "starting refinement round"
            );
            let round = self.run_round(pool, &best, baseline).await;
            if round.improved {
                info!(
                    outer_round = outer + 1,
                    score = round.best_score_after,
                    "round improved best score"
                );
            } else {
                info!(outer_round = outer + 1, "round produced no improvement");
            }
            pool.record_round(round);
        }
    }

    /// One outer round: ablation, generation, concurrent execution,
    /// selection. Always returns a round record, even on total failure.
    async fn run_round(
        &self,
        pool: &mut CandidatePool,
        best: &CodeArtifact,
        baseline: f64,
    ) -> RefinementRound {
        let round_index = pool.rounds().len() as u32;
        let mut round = RefinementRound::new(round_index, RoundStage::Refinement);
        round.best_score_after = Some(baseline);

        // Ablation: rank regions of the current best by score impact.
        let report = self.analyzer.analyze(best, baseline).await;
        let Some(target) = report.top_region() else {
            warn!("ablation produced no regions; recording no-op round");
            return round;
        };
        let region = target.region.clone();
        round.target_region = Some(region.clone());
        info!(region = %region, impact = target.impact, "selected mutation target");

        // Generation: competing improvement strategies for the target.
        let request = ProposeRequest::new(
            &self.task,
            ProposalKind::Improve {
                base_code: best.source.clone(),
                region: region.clone(),
            },
            self.search.inner_loop_rounds,
        );
        let variants = match self.oracle.propose(request).await {
            Ok(variants) => variants,
            Err(err) => {
                // Oracle failure degrades to "no new attempts this round".
                warn!(error = %err, "improvement generation failed; recording no-op round");
                return round;
            }
        };

        let artifacts: Vec<CodeArtifact> = variants
            .into_iter()
            .map(|source| CodeArtifact::refinement(source, best, round_index, &region))
            .collect();

        // Execution: one concurrent batch, barrier-synchronized. join_all
        // preserves generation order regardless of completion order.
        let attempts: Vec<EvaluatedAttempt> = join_all(
            artifacts
                .into_iter()
                .map(|artifact| self.runner.evaluate(&self.task, artifact)),
        )
        .await;

        for attempt in &attempts {
            round.push_attempt(attempt.record());
        }

        // Selection: deterministic, monotone.
        if let Some((index, score)) = select_best(&attempts, pool.direction()) {
            if pool.direction().improves(score, baseline) {
                round.mark_improved(attempts[index].artifact.id, score);
            }
        }

        // Retain every attempted variant, winners and failures alike.
        for attempt in attempts {
            for (artifact, result) in attempt.superseded {
                pool.record_attempt(artifact, result);
            }
            pool.record_attempt(attempt.artifact, attempt.result);
        }

        round
    }
}
