//! Refinement round records.
//!
//! Append-only history of the search: every round, attempt, and failure is
//! recorded so a post-mortem of any run can reconstruct what was tried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution::ExecutionStatus;

/// Which stage of the pipeline a round belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStage {
    /// Seeding of initial candidates.
    Seeding,
    /// Ablation-guided refinement of the current best.
    Refinement,
    /// Combination-strategy search over the top candidates.
    Ensemble,
}

impl RoundStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeding => "seeding",
            Self::Refinement => "refinement",
            Self::Ensemble => "ensemble",
        }
    }
}

/// Record of one improvement attempt within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Final artifact of the attempt (the repaired one, if repair ran).
    pub artifact_id: Uuid,
    /// Final execution status after any repair.
    pub status: ExecutionStatus,
    /// Final score, when succeeded.
    pub score: Option<f64>,
    /// Oracle calls spent on repair for this attempt.
    pub repair_attempts: u32,
}

/// Record of one outer-loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementRound {
    /// Round index, increasing across all stages.
    pub round: u32,
    /// Stage this round ran under.
    pub stage: RoundStage,
    /// Region targeted for mutation; `None` for seeding/ensemble rounds.
    pub target_region: Option<String>,
    /// Every attempt made this round, in generation order.
    pub attempts: Vec<AttemptRecord>,
    /// Winning artifact, if the round improved on the incumbent best.
    pub winner: Option<Uuid>,
    /// Whether the round improved the best score.
    pub improved: bool,
    /// Best known score after the round closed.
    pub best_score_after: Option<f64>,
    /// When the round was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl RefinementRound {
    /// Start an empty round record.
    pub fn new(round: u32, stage: RoundStage) -> Self {
        Self {
            round,
            stage,
            target_region: None,
            attempts: Vec::new(),
            winner: None,
            improved: false,
            best_score_after: None,
            recorded_at: Utc::now(),
        }
    }

    /// Set the mutation target region.
    pub fn with_target_region(mut self, region: impl Into<String>) -> Self {
        self.target_region = Some(region.into());
        self
    }

    /// Record an attempt.
    pub fn push_attempt(&mut self, attempt: AttemptRecord) {
        self.attempts.push(attempt);
    }

    /// Mark the round as improved by `winner`.
    pub fn mark_improved(&mut self, winner: Uuid, score: f64) {
        self.winner = Some(winner);
        self.improved = true;
        self.best_score_after = Some(score);
    }

    /// Number of attempts that ended with a usable score.
    pub fn successful_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| a.status.is_success()).count()
    }
}
