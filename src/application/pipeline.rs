//! Pipeline: stage driver for a full run.
//!
//! Seeds initial candidates, runs the refinement loop, runs the ensemble
//! composer, then hands the winning artifact off as the run's output:
//! the solution source plus a JSON run report for post-hoc inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{
    CodeArtifact, Config, RefinementRound, RoundStage, TaskConfig, TaskSpec,
};
use crate::domain::ports::{ArtifactExecutor, ProposalKind, ProposeRequest, SynthesisOracle};
use crate::domain::PipelineError;

use super::ablation::AblationAnalyzer;
use super::attempts::{select_best, AttemptRunner};
use super::ensemble::EnsembleComposer;
use super::pool::CandidatePool;
use super::refinement::RefinementController;
use super::repair::RepairLoop;

/// Wall-clock duration of one pipeline stage, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    /// Stage name.
    pub stage: String,
    /// Duration in seconds.
    pub seconds: f64,
}

/// JSON-serializable summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Task name.
    pub task: String,
    /// Metric name.
    pub metric: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Per-stage wall-clock timings.
    pub stages: Vec<StageTiming>,
    /// Full round history.
    pub rounds: Vec<RefinementRound>,
    /// Id of the winning artifact.
    pub best_artifact_id: Uuid,
    /// Whether the winner is an ensemble combination.
    pub best_is_ensemble: bool,
    /// Final best score.
    pub best_score: f64,
    /// Total artifacts attempted across the run.
    pub artifacts_attempted: usize,
}

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The winning artifact.
    pub best: CodeArtifact,
    /// Its score.
    pub best_score: f64,
    /// The run report, as written to disk.
    pub report: RunReport,
    /// Where the winning source was written.
    pub solution_path: PathBuf,
    /// Where the report was written.
    pub report_path: PathBuf,
}

/// Load a [`TaskSpec`] from configuration, reading the task description
/// file from the dataset directory when present.
pub async fn load_task(task: &TaskConfig) -> TaskSpec {
    let dataset_dir = Path::new(&task.data_dir).join(&task.name);
    let mut spec = TaskSpec::new(&task.name, &task.metric, task.direction)
        .with_dataset_dir(&dataset_dir);

    for candidate in ["task_description.txt", "description.txt", "README.txt"] {
        let path = dataset_dir.join(candidate);
        if let Ok(text) = tokio::fs::read_to_string(&path).await {
            spec = spec.with_description(text);
            break;
        }
    }
    spec
}

/// Drives seeding, refinement, ensembling, and output handoff.
pub struct Pipeline {
    config: Config,
    task: TaskSpec,
    oracle: Arc<dyn SynthesisOracle>,
    executor: Arc<dyn ArtifactExecutor>,
}

impl Pipeline {
    /// Create a pipeline for `task` using the given collaborators.
    pub fn new(
        config: Config,
        task: TaskSpec,
        oracle: Arc<dyn SynthesisOracle>,
        executor: Arc<dyn ArtifactExecutor>,
    ) -> Self {
        Self {
            config,
            task,
            oracle,
            executor,
        }
    }

    /// Execute the full pipeline.
    ///
    /// The only fatal conditions are zero successful seeds (no solution
    /// to refine) and I/O failures writing the final outputs; everything
    /// else is recovered inside the stages.
    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let started_at = Utc::now();
        let mut stages = Vec::new();
        let search = self.config.search.clone();

        let semaphore = Arc::new(Semaphore::new(search.max_concurrent_executions.max(1)));
        let repair = RepairLoop::new(
            self.oracle.clone(),
            self.executor.clone(),
            search.max_repair_attempts,
        );
        let runner = Arc::new(AttemptRunner::new(
            self.executor.clone(),
            repair,
            semaphore,
        ));

        let mut pool = CandidatePool::new(self.task.direction);

        // Stage 1: seed initial candidates.
        let t = Instant::now();
        self.seed(&mut pool, &runner).await;
        stages.push(StageTiming {
            stage: "seeding".to_string(),
            seconds: t.elapsed().as_secs_f64(),
        });
        if pool.current_best().is_none() {
            return Err(PipelineError::NoSolutionFound);
        }

        // Stage 2: ablation-guided refinement.
        let t = Instant::now();
        let analyzer = AblationAnalyzer::new(self.executor.clone(), self.task.direction);
        let controller = RefinementController::new(
            self.task.clone(),
            search.clone(),
            self.oracle.clone(),
            analyzer,
            runner.clone(),
        );
        controller.run(&mut pool).await;
        stages.push(StageTiming {
            stage: "refinement".to_string(),
            seconds: t.elapsed().as_secs_f64(),
        });

        // Stage 3: ensemble composition.
        let t = Instant::now();
        let composer = EnsembleComposer::new(
            self.task.clone(),
            search,
            self.oracle.clone(),
            runner,
        );
        composer.run(&mut pool).await;
        stages.push(StageTiming {
            stage: "ensemble".to_string(),
            seconds: t.elapsed().as_secs_f64(),
        });

        // Stage 4: handoff.
        let best = pool
            .current_best()
            .cloned()
            .ok_or(PipelineError::NoSolutionFound)?;
        let best_score = pool
            .best_score()
            .ok_or(PipelineError::NoSolutionFound)?;

        let report = RunReport {
            task: self.task.name.clone(),
            metric: self.task.metric.clone(),
            started_at,
            finished_at: Utc::now(),
            stages,
            rounds: pool.rounds().to_vec(),
            best_artifact_id: best.id,
            best_is_ensemble: best.is_ensemble(),
            best_score,
            artifacts_attempted: pool.len(),
        };
        let (solution_path, report_path) = self.write_outputs(&best, &report).await?;

        info!(
            best_id = %best.id,
            best_score,
            ensemble = best.is_ensemble(),
            "pipeline completed"
        );
        Ok(RunOutcome {
            best,
            best_score,
            report,
            solution_path,
            report_path,
        })
    }

    /// Stage 1: ask the oracle for independent baselines, evaluate them
    /// concurrently (with repair), and seed the pool with everything.
    async fn seed(&self, pool: &mut CandidatePool, runner: &AttemptRunner) {
        let request = ProposeRequest::new(
            &self.task,
            ProposalKind::Seed,
            self.config.search.num_seed_solutions,
        );
        let variants = match self.oracle.propose(request).await {
            Ok(variants) => variants,
            Err(err) => {
                warn!(error = %err, "seed generation failed");
                return;
            }
        };
        info!(candidates = variants.len(), "evaluating seed candidates");

        let attempts = join_all(
            variants
                .into_iter()
                .map(CodeArtifact::seed)
                .map(|artifact| runner.evaluate(&self.task, artifact)),
        )
        .await;

        let mut round = RefinementRound::new(0, RoundStage::Seeding);
        for attempt in &attempts {
            round.push_attempt(attempt.record());
        }
        if let Some((index, score)) = select_best(&attempts, pool.direction()) {
            round.mark_improved(attempts[index].artifact.id, score);
        }

        let mut candidates = Vec::new();
        for attempt in attempts {
            for pair in attempt.superseded {
                candidates.push(pair);
            }
            candidates.push((attempt.artifact, attempt.result));
        }
        pool.seed(candidates);
        pool.record_round(round);
    }

    /// Stage 4: write the winning source and the run report.
    async fn write_outputs(
        &self,
        best: &CodeArtifact,
        report: &RunReport,
    ) -> Result<(PathBuf, PathBuf), PipelineError> {
        let out_dir = Path::new(&self.config.task.workspace_dir).join(&self.task.name);
        tokio::fs::create_dir_all(&out_dir)
            .await
            .map_err(|source| PipelineError::Workspace {
                path: out_dir.display().to_string(),
                source,
            })?;

        let solution_path = out_dir.join("best_solution.py");
        tokio::fs::write(&solution_path, &best.source)
            .await
            .map_err(|source| PipelineError::Output {
                path: solution_path.display().to_string(),
                source,
            })?;

        let report_path = out_dir.join("run_report.json");
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| PipelineError::Output {
                path: report_path.display().to_string(),
                source: std::io::Error::other(e),
            })?;
        tokio::fs::write(&report_path, json)
            .await
            .map_err(|source| PipelineError::Output {
                path: report_path.display().to_string(),
                source,
            })?;

        Ok((solution_path, report_path))
    }
}
