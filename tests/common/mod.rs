//! Shared scripted doubles for pipeline integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crucible::domain::models::{CodeArtifact, Config, ExecutionResult, MetricDirection};
use crucible::domain::ports::{ArtifactExecutor, OracleError, ProposeRequest, SynthesisOracle};

/// Oracle that replays a fixed queue of responses in call order and
/// records every request it receives.
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<Vec<String>, OracleError>>>,
    pub requests: Mutex<Vec<ProposeRequest>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<Vec<String>, OracleError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> ProposeRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl SynthesisOracle for ScriptedOracle {
    async fn propose(&self, request: ProposeRequest) -> Result<Vec<String>, OracleError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::MalformedResponse("script exhausted".into())))
    }
}

/// How a [`TagExecutor`] resolves a matching source.
#[derive(Clone)]
pub enum Outcome {
    Score(f64),
    Fail(&'static str),
}

/// Executor that resolves an artifact by the first rule whose needle
/// appears in its source. Sources that match no rule fail, which keeps
/// unexpected artifacts visible in assertions.
pub struct TagExecutor {
    rules: Vec<(&'static str, Outcome)>,
    pub calls: AtomicUsize,
}

impl TagExecutor {
    pub fn new(rules: Vec<(&'static str, Outcome)>) -> Self {
        Self {
            rules,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn executions(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn resolve(&self, id: Uuid, source: &str) -> ExecutionResult {
        for (needle, outcome) in &self.rules {
            if source.contains(needle) {
                return match outcome {
                    Outcome::Score(score) => ExecutionResult::succeeded(
                        id,
                        *score,
                        format!("Final Validation Performance: {score}"),
                        String::new(),
                        Duration::from_millis(5),
                    ),
                    Outcome::Fail(trace) => ExecutionResult::failed(
                        id,
                        (*trace).to_string(),
                        String::new(),
                        String::new(),
                        Duration::from_millis(5),
                    ),
                };
            }
        }
        ExecutionResult::failed(
            id,
            format!("no rule matched source: {source}"),
            String::new(),
            String::new(),
            Duration::ZERO,
        )
    }
}

#[async_trait]
impl ArtifactExecutor for TagExecutor {
    async fn execute(&self, artifact: &CodeArtifact) -> ExecutionResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.resolve(artifact.id, &artifact.source)
    }
}

/// Config with small, explicit knobs and an isolated workspace.
pub fn test_config(workspace_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.task.name = "housing".to_string();
    config.task.metric = "rmse".to_string();
    config.task.direction = MetricDirection::Minimize;
    config.task.workspace_dir = workspace_dir.display().to_string();
    config.search.num_seed_solutions = 2;
    config.search.outer_loop_rounds = 2;
    config.search.inner_loop_rounds = 2;
    config.search.ensemble_loop_rounds = 2;
    config.search.ensemble_top_k = 3;
    config.search.max_repair_attempts = 3;
    config.search.max_concurrent_executions = 2;
    config
}
