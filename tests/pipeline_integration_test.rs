//! End-to-end pipeline runs against scripted oracle and executor doubles.
//!
//! These exercise the full stage sequence (seeding, ablation-guided
//! refinement, ensembling, output handoff) and the loop's failure
//! tolerance without touching the network or a real interpreter.

mod common;

use std::sync::Arc;

use crucible::application::{load_task, Pipeline};
use crucible::domain::models::{ExecutionStatus, MetricDirection, RoundStage, TaskSpec};
use crucible::domain::ports::ProposalKind;
use crucible::domain::PipelineError;
use tempfile::TempDir;

use common::{test_config, Outcome, ScriptedOracle, TagExecutor};

fn task() -> TaskSpec {
    TaskSpec::new("housing", "rmse", MetricDirection::Minimize)
        .with_description("Predict median house value; report validation RMSE.")
}

#[tokio::test]
async fn test_full_run_monotone_improvement_and_ensemble_win() {
    let workspace = TempDir::new().unwrap();
    let config = test_config(workspace.path());

    // Call order: seed, improve x2 (outer rounds), ensemble x2.
    let oracle = Arc::new(ScriptedOracle::new(vec![
        Ok(vec!["seed alpha".into(), "seed beta".into()]),
        Ok(vec!["variant r1a".into(), "variant r1b".into()]),
        Ok(vec!["variant r2a".into(), "variant r2b".into()]),
        Ok(vec!["combo one".into()]),
        Ok(vec!["combo two".into()]),
    ]));
    let executor = Arc::new(TagExecutor::new(vec![
        ("seed alpha", Outcome::Score(0.25)),
        ("seed beta", Outcome::Score(0.30)),
        ("variant r1a", Outcome::Score(0.18)),
        ("variant r1b", Outcome::Score(0.22)),
        ("variant r2a", Outcome::Score(0.21)),
        ("variant r2b", Outcome::Score(0.19)),
        ("combo one", Outcome::Score(0.19)),
        ("combo two", Outcome::Score(0.16)),
    ]));

    let pipeline = Pipeline::new(config, task(), oracle.clone(), executor.clone());
    let outcome = pipeline.run().await.expect("pipeline should complete");

    // The ensemble combination wins; the weaker combo was discarded.
    assert!((outcome.best_score - 0.16).abs() < 1e-12);
    assert!(outcome.best.is_ensemble());
    assert_eq!(outcome.best.source, "combo two");

    // Round history: seeding, two refinement rounds, two ensemble rounds.
    let rounds = &outcome.report.rounds;
    assert_eq!(rounds.len(), 5);
    assert_eq!(rounds[0].stage, RoundStage::Seeding);
    assert!(rounds[0].improved);
    assert_eq!(rounds[0].best_score_after, Some(0.25));

    assert_eq!(rounds[1].stage, RoundStage::Refinement);
    assert!(rounds[1].improved);
    assert_eq!(rounds[1].best_score_after, Some(0.18));

    // Second refinement round produced nothing better than 0.18.
    assert!(!rounds[2].improved);
    assert_eq!(rounds[2].best_score_after, Some(0.18));

    assert_eq!(rounds[3].stage, RoundStage::Ensemble);
    assert!(!rounds[3].improved);
    assert!(rounds[4].improved);
    assert_eq!(rounds[4].best_score_after, Some(0.16));

    // 5 oracle calls, 10 executions (2 seeds + 2 ablation probes + 4
    // refinement variants + 2 combinations).
    assert_eq!(oracle.calls(), 5);
    assert_eq!(executor.executions(), 10);

    // The first ensemble request carried the top-3 candidates, best first,
    // and no prior attempts; the second fed back the first combo's score.
    let first = oracle.request(3);
    match first.kind {
        ProposalKind::Ensemble {
            parent_sources,
            prior_attempts,
        } => {
            assert_eq!(
                parent_sources,
                vec!["variant r1a", "variant r2b", "variant r2a"]
            );
            assert!(prior_attempts.is_empty());
        }
        other => panic!("expected ensemble request, got {}", other.as_str()),
    }
    match oracle.request(4).kind {
        ProposalKind::Ensemble { prior_attempts, .. } => {
            assert_eq!(prior_attempts.len(), 1);
            assert!(prior_attempts[0].contains("0.19"));
        }
        other => panic!("expected ensemble request, got {}", other.as_str()),
    }

    // Output handoff: winning source plus a parseable JSON report.
    let written = std::fs::read_to_string(&outcome.solution_path).unwrap();
    assert_eq!(written, "combo two");
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.report_path).unwrap()).unwrap();
    assert_eq!(report["best_score"], 0.16);
    assert_eq!(report["best_is_ensemble"], true);
    assert_eq!(report["task"], "housing");
}

#[tokio::test]
async fn test_failed_seed_is_repaired_and_can_win() {
    let workspace = TempDir::new().unwrap();
    let mut config = test_config(workspace.path());
    config.search.outer_loop_rounds = 0;
    config.search.ensemble_loop_rounds = 0;

    // Repair takes two oracle calls: first correction still fails, second
    // runs clean and beats the healthy seed.
    let oracle = Arc::new(ScriptedOracle::new(vec![
        Ok(vec!["good seed".into(), "bad seed".into()]),
        Ok(vec!["still bad".into()]),
        Ok(vec!["fixed seed".into()]),
    ]));
    let executor = Arc::new(TagExecutor::new(vec![
        ("good seed", Outcome::Score(0.20)),
        ("bad seed", Outcome::Fail("TypeError: bad input")),
        ("still bad", Outcome::Fail("TypeError: still bad")),
        ("fixed seed", Outcome::Score(0.17)),
    ]));

    let pipeline = Pipeline::new(config, task(), oracle.clone(), executor.clone());
    let outcome = pipeline.run().await.expect("pipeline should complete");

    assert!((outcome.best_score - 0.17).abs() < 1e-12);
    assert_eq!(outcome.best.source, "fixed seed");
    assert_eq!(oracle.calls(), 3);

    let seeding = &outcome.report.rounds[0];
    assert_eq!(seeding.attempts.len(), 2);
    let repaired = seeding
        .attempts
        .iter()
        .find(|a| a.repair_attempts > 0)
        .expect("one attempt went through repair");
    assert_eq!(repaired.repair_attempts, 2);
    assert_eq!(repaired.status, ExecutionStatus::Succeeded);

    // The original failed artifact and the failed intermediate repair both
    // stay in the pool alongside the winner: good seed, bad seed, the
    // still-failing correction, and the fix.
    assert_eq!(outcome.report.artifacts_attempted, 4);
}

#[tokio::test]
async fn test_round_where_everything_fails_is_a_noop() {
    let workspace = TempDir::new().unwrap();
    let mut config = test_config(workspace.path());
    config.search.outer_loop_rounds = 1;
    config.search.ensemble_loop_rounds = 0;

    // Both improvement variants fail; repair responses run out, so every
    // repair call errors and the attempts stay failed.
    let oracle = Arc::new(ScriptedOracle::new(vec![
        Ok(vec!["seed s1".into(), "seed s2".into()]),
        Ok(vec!["broken x".into(), "broken y".into()]),
    ]));
    let executor = Arc::new(TagExecutor::new(vec![
        ("seed s1", Outcome::Score(0.21)),
        ("seed s2", Outcome::Score(0.24)),
        ("broken x", Outcome::Fail("ValueError")),
        ("broken y", Outcome::Fail("KeyError")),
    ]));

    let pipeline = Pipeline::new(config, task(), oracle.clone(), executor);
    let outcome = pipeline.run().await.expect("pipeline should complete");

    // Best is unchanged and came from seeding.
    assert!((outcome.best_score - 0.21).abs() < 1e-12);
    assert_eq!(outcome.best.source, "seed s1");

    let refinement = &outcome.report.rounds[1];
    assert_eq!(refinement.stage, RoundStage::Refinement);
    assert!(!refinement.improved);
    assert_eq!(refinement.successful_attempts(), 0);
    assert_eq!(refinement.best_score_after, Some(0.21));

    // Seed(1) + improve(1) + 3 exhausted repair calls per failed variant.
    assert_eq!(oracle.calls(), 8);
}

#[tokio::test]
async fn test_no_successful_seed_is_fatal() {
    let workspace = TempDir::new().unwrap();
    let config = test_config(workspace.path());

    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(vec![
        "dead a".into(),
        "dead b".into(),
    ])]));
    let executor = Arc::new(TagExecutor::new(vec![
        ("dead a", Outcome::Fail("SyntaxError")),
        ("dead b", Outcome::Fail("ImportError")),
    ]));

    let pipeline = Pipeline::new(config, task(), oracle, executor);
    let err = pipeline.run().await.expect_err("run must fail");
    assert!(matches!(err, PipelineError::NoSolutionFound));
}

#[tokio::test]
async fn test_oracle_down_at_seeding_is_fatal_not_a_panic() {
    let workspace = TempDir::new().unwrap();
    let config = test_config(workspace.path());

    // Script is empty, so the seed call itself errors.
    let oracle = Arc::new(ScriptedOracle::new(vec![]));
    let executor = Arc::new(TagExecutor::new(vec![]));

    let pipeline = Pipeline::new(config, task(), oracle, executor);
    let err = pipeline.run().await.expect_err("run must fail");
    assert!(matches!(err, PipelineError::NoSolutionFound));
}

#[tokio::test]
async fn test_load_task_reads_description_file() {
    let data_dir = TempDir::new().unwrap();
    let task_dir = data_dir.path().join("housing");
    std::fs::create_dir_all(&task_dir).unwrap();
    std::fs::write(
        task_dir.join("task_description.txt"),
        "Predict the median house value.",
    )
    .unwrap();

    let mut config = test_config(data_dir.path());
    config.task.data_dir = data_dir.path().display().to_string();

    let spec = load_task(&config.task).await;
    assert_eq!(spec.name, "housing");
    assert!(spec.description.contains("median house value"));
    assert_eq!(spec.dataset_dir, task_dir);
}
