//! Ensemble composer: combination-strategy search over top candidates.
//!
//! Takes the pool's top-k candidates and runs a bounded number of rounds,
//! each asking the oracle for one combination strategy (voting, stacking,
//! blending) over the fixed candidate set, executed and repaired like any
//! other attempt. Selection is monotone against the overall best score,
//! so ensembling is strictly optional improvement: if no combination beats
//! the best single candidate, the single candidate stands.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{
    CodeArtifact, RefinementRound, RoundStage, SearchConfig, TaskSpec,
};
use crate::domain::ports::{ProposalKind, ProposeRequest, SynthesisOracle};

use super::attempts::AttemptRunner;
use super::pool::CandidatePool;

/// Runs the post-refinement combination-strategy search.
pub struct EnsembleComposer {
    task: TaskSpec,
    search: SearchConfig,
    oracle: Arc<dyn SynthesisOracle>,
    runner: Arc<AttemptRunner>,
}

impl EnsembleComposer {
    /// Create a composer for `task`.
    pub fn new(
        task: TaskSpec,
        search: SearchConfig,
        oracle: Arc<dyn SynthesisOracle>,
        runner: Arc<AttemptRunner>,
    ) -> Self {
        Self {
            task,
            search,
            oracle,
            runner,
        }
    }

    /// Run `ensemble_loop_rounds` combination rounds against the pool.
    ///
    /// Needs at least two successful candidates to combine; otherwise the
    /// stage is skipped entirely.
    pub async fn run(&self, pool: &mut CandidatePool) {
        let parents: Vec<(Uuid, String)> = pool
            .top_k(self.search.ensemble_top_k)
            .into_iter()
            .map(|a| (a.id, a.source.clone()))
            .collect();
        if parents.len() < 2 {
            info!(
                candidates = parents.len(),
                "not enough candidates for ensembling; skipping stage"
            );
            return;
        }

        let parent_ids: Vec<Uuid> = parents.iter().map(|(id, _)| *id).collect();
        let parent_sources: Vec<String> = parents.into_iter().map(|(_, s)| s).collect();
        let mut prior_attempts: Vec<String> = Vec::new();

        for iteration in 0..self.search.ensemble_loop_rounds {
            let baseline = pool
                .best_score()
                .expect("ensemble stage runs only with a seeded pool");
            let round_index = pool.rounds().len() as u32;
            let mut round = RefinementRound::new(round_index, RoundStage::Ensemble);
            round.best_score_after = Some(baseline);

            info!(
                iteration = iteration + 1,
                total = self.search.ensemble_loop_rounds,
                baseline,
                "starting ensemble round"
            );

            let request = ProposeRequest::new(
                &self.task,
                ProposalKind::Ensemble {
                    parent_sources: parent_sources.clone(),
                    prior_attempts: prior_attempts.clone(),
                },
                1,
            );
            let source = match self.oracle.propose(request).await {
                Ok(mut variants) if !variants.is_empty() => variants.swap_remove(0),
                Ok(_) => {
                    warn!("oracle returned no combination strategy; recording no-op round");
                    pool.record_round(round);
                    continue;
                }
                Err(err) => {
                    warn!(error = %err, "ensemble generation failed; recording no-op round");
                    pool.record_round(round);
                    continue;
                }
            };

            let artifact = CodeArtifact::ensemble(source, parent_ids.clone(), round_index);
            let attempt = self.runner.evaluate(&self.task, artifact).await;
            round.push_attempt(attempt.record());

            match attempt.result.score {
                Some(score) => {
                    prior_attempts.push(format!(
                        "combination {} scored {score:.5}",
                        iteration + 1
                    ));
                    if pool.direction().improves(score, baseline) {
                        round.mark_improved(attempt.artifact.id, score);
                        info!(score, "ensemble improved on best single candidate");
                    } else {
                        info!(score, baseline, "ensemble did not beat incumbent; discarded");
                    }
                }
                None => {
                    prior_attempts.push(format!(
                        "combination {} failed to execute",
                        iteration + 1
                    ));
                }
            }

            for (a, r) in attempt.superseded {
                pool.record_attempt(a, r);
            }
            pool.record_attempt(attempt.artifact, attempt.result);
            pool.record_round(round);
        }
    }
}
