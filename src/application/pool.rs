//! Candidate pool: owns every artifact the run produces.
//!
//! The pool keeps the full lineage history (artifacts are never discarded,
//! only superseded) plus the append-only round history, and maintains the
//! single "current best" pointer. The pointer is mutated only by round
//! selection and only ever moves to a successfully scored artifact, so
//! refinement is monotone-non-decreasing by construction.

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::models::{
    CodeArtifact, ExecutionResult, MetricDirection, RefinementRound,
};

/// Owns all artifacts, their execution results, and the round history.
#[derive(Debug)]
pub struct CandidatePool {
    direction: MetricDirection,
    artifacts: HashMap<Uuid, CodeArtifact>,
    results: HashMap<Uuid, ExecutionResult>,
    rounds: Vec<RefinementRound>,
    best: Option<Uuid>,
}

impl CandidatePool {
    /// Create an empty pool for a task with the given metric direction.
    pub fn new(direction: MetricDirection) -> Self {
        Self {
            direction,
            artifacts: HashMap::new(),
            results: HashMap::new(),
            rounds: Vec::new(),
            best: None,
        }
    }

    /// Metric direction the pool orders by.
    pub fn direction(&self) -> MetricDirection {
        self.direction
    }

    /// Record an attempted artifact and its execution result.
    ///
    /// Failed attempts are retained too (the history must reconstruct
    /// every attempted variant); recording alone never moves the best
    /// pointer, so a non-succeeded result cannot affect selection.
    pub fn record_attempt(&mut self, artifact: CodeArtifact, result: ExecutionResult) {
        debug_assert_eq!(artifact.id, result.artifact_id);
        self.artifacts.insert(artifact.id, artifact);
        self.results.insert(result.artifact_id, result);
    }

    /// Seed the pool with initial candidates and point "best" at the
    /// highest-ranked successful one, if any.
    pub fn seed(&mut self, candidates: Vec<(CodeArtifact, ExecutionResult)>) {
        for (artifact, result) in candidates {
            self.record_attempt(artifact, result);
        }
        self.best = self.rank_succeeded().first().copied();
        if let Some(id) = self.best {
            info!(
                best_id = %id,
                score = self.score_of(id),
                "candidate pool seeded"
            );
        }
    }

    /// Append a round record; if the round improved, advance the best
    /// pointer to the winner. The winner must reference a succeeded,
    /// already-recorded artifact.
    pub fn record_round(&mut self, round: RefinementRound) {
        if round.improved {
            if let Some(winner) = round.winner {
                debug_assert!(
                    self.results
                        .get(&winner)
                        .is_some_and(ExecutionResult::is_success),
                    "round winner must be a succeeded artifact"
                );
                self.best = Some(winner);
                debug!(round = round.round, winner = %winner, "best pointer advanced");
            }
        }
        self.rounds.push(round);
    }

    /// The current best artifact, or `None` before seeding succeeds.
    pub fn current_best(&self) -> Option<&CodeArtifact> {
        self.best.and_then(|id| self.artifacts.get(&id))
    }

    /// Score of the current best artifact.
    pub fn best_score(&self) -> Option<f64> {
        self.best.and_then(|id| self.score_of(id))
    }

    /// The `k` highest-ranked successful candidates, best first.
    ///
    /// Uses the run-wide total order: score in metric direction, ties
    /// broken by earlier creation round, then earlier creation time.
    pub fn top_k(&self, k: usize) -> Vec<&CodeArtifact> {
        self.rank_succeeded()
            .into_iter()
            .take(k)
            .filter_map(|id| self.artifacts.get(&id))
            .collect()
    }

    /// Score recorded for `id`, when its execution succeeded.
    pub fn score_of(&self, id: Uuid) -> Option<f64> {
        self.results.get(&id).and_then(|r| r.score)
    }

    /// Execution result recorded for `id`.
    pub fn result_of(&self, id: Uuid) -> Option<&ExecutionResult> {
        self.results.get(&id)
    }

    /// Full round history, in recording order.
    pub fn rounds(&self) -> &[RefinementRound] {
        &self.rounds
    }

    /// Number of artifacts retained (all attempts, not just survivors).
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the pool holds no artifacts.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Ids of succeeded artifacts in total order, best first.
    fn rank_succeeded(&self) -> Vec<Uuid> {
        let mut ranked: Vec<&ExecutionResult> = self
            .results
            .values()
            .filter(|r| r.is_success())
            .collect();
        ranked.sort_by(|a, b| {
            let (sa, sb) = (a.score.unwrap_or(f64::NAN), b.score.unwrap_or(f64::NAN));
            self.direction.compare(sa, sb).then_with(|| {
                let (aa, ab) = (
                    self.artifacts.get(&a.artifact_id),
                    self.artifacts.get(&b.artifact_id),
                );
                match (aa, ab) {
                    (Some(x), Some(y)) => x
                        .round
                        .cmp(&y.round)
                        .then_with(|| x.created_at.cmp(&y.created_at)),
                    _ => std::cmp::Ordering::Equal,
                }
            })
        });
        ranked.into_iter().map(|r| r.artifact_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RoundStage;
    use std::time::Duration;

    fn scored(artifact: &CodeArtifact, score: f64) -> ExecutionResult {
        ExecutionResult::succeeded(
            artifact.id,
            score,
            String::new(),
            String::new(),
            Duration::from_secs(1),
        )
    }

    fn failed(artifact: &CodeArtifact) -> ExecutionResult {
        ExecutionResult::failed(
            artifact.id,
            "boom".into(),
            String::new(),
            String::new(),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_seed_picks_best_successful_candidate() {
        let mut pool = CandidatePool::new(MetricDirection::Minimize);
        let a = CodeArtifact::seed("a");
        let b = CodeArtifact::seed("b");
        let c = CodeArtifact::seed("c");
        let ra = scored(&a, 0.25);
        let rb = scored(&b, 0.20);
        let rc = failed(&c);
        pool.seed(vec![(a, ra), (b.clone(), rb), (c, rc)]);
        assert_eq!(pool.current_best().unwrap().id, b.id);
        assert_eq!(pool.best_score(), Some(0.20));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_seed_leaves_best_unset() {
        let mut pool = CandidatePool::new(MetricDirection::Minimize);
        let a = CodeArtifact::seed("a");
        let ra = failed(&a);
        pool.seed(vec![(a, ra)]);
        assert!(pool.current_best().is_none());
        assert!(pool.best_score().is_none());
    }

    #[test]
    fn test_failed_attempt_never_moves_best() {
        let mut pool = CandidatePool::new(MetricDirection::Minimize);
        let seed = CodeArtifact::seed("seed");
        let r = scored(&seed, 0.25);
        pool.seed(vec![(seed.clone(), r)]);

        let bad = CodeArtifact::refinement("bad", &seed, 1, "train");
        let rb = failed(&bad);
        pool.record_attempt(bad, rb);
        assert_eq!(pool.current_best().unwrap().id, seed.id);

        let mut round = RefinementRound::new(1, RoundStage::Refinement);
        // No improvement recorded.
        round.improved = false;
        pool.record_round(round);
        assert_eq!(pool.current_best().unwrap().id, seed.id);
    }

    #[test]
    fn test_record_round_advances_best_on_improvement() {
        let mut pool = CandidatePool::new(MetricDirection::Minimize);
        let seed = CodeArtifact::seed("seed");
        let r = scored(&seed, 0.25);
        pool.seed(vec![(seed.clone(), r)]);

        let better = CodeArtifact::refinement("better", &seed, 1, "train");
        let rb = scored(&better, 0.18);
        pool.record_attempt(better.clone(), rb);

        let mut round = RefinementRound::new(1, RoundStage::Refinement);
        round.mark_improved(better.id, 0.18);
        pool.record_round(round);

        assert_eq!(pool.current_best().unwrap().id, better.id);
        assert_eq!(pool.best_score(), Some(0.18));
        assert_eq!(pool.rounds().len(), 1);
    }

    #[test]
    fn test_top_k_total_order_breaks_ties_by_round() {
        let mut pool = CandidatePool::new(MetricDirection::Minimize);
        let seed = CodeArtifact::seed("seed");
        let rs = scored(&seed, 0.20);
        pool.seed(vec![(seed.clone(), rs)]);

        // Same score, later round: seed must rank first.
        let later = CodeArtifact::refinement("later", &seed, 2, "train");
        let rl = scored(&later, 0.20);
        pool.record_attempt(later.clone(), rl);

        let worse = CodeArtifact::refinement("worse", &seed, 1, "train");
        let rw = scored(&worse, 0.30);
        pool.record_attempt(worse.clone(), rw);

        let top = pool.top_k(3);
        let ids: Vec<Uuid> = top.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![seed.id, later.id, worse.id]);
    }

    #[test]
    fn test_nan_score_never_outranks_finite_score() {
        for direction in [MetricDirection::Minimize, MetricDirection::Maximize] {
            let mut pool = CandidatePool::new(direction);
            let bad = CodeArtifact::seed("nan");
            let good = CodeArtifact::seed("good");
            let rb = scored(&bad, f64::NAN);
            let rg = scored(&good, 0.9);
            pool.seed(vec![(bad.clone(), rb), (good.clone(), rg)]);
            assert_eq!(pool.current_best().unwrap().id, good.id);
            let top: Vec<Uuid> = pool.top_k(2).iter().map(|a| a.id).collect();
            assert_eq!(top, vec![good.id, bad.id]);
        }
    }

    #[test]
    fn test_top_k_respects_maximize_direction() {
        let mut pool = CandidatePool::new(MetricDirection::Maximize);
        let a = CodeArtifact::seed("a");
        let b = CodeArtifact::seed("b");
        let ra = scored(&a, 0.80);
        let rb = scored(&b, 0.90);
        pool.seed(vec![(a, ra), (b.clone(), rb)]);
        assert_eq!(pool.top_k(1)[0].id, b.id);
        assert_eq!(pool.best_score(), Some(0.90));
    }
}
