//! Application layer: the search controller and its stages.

pub mod ablation;
pub mod attempts;
pub mod ensemble;
pub mod pipeline;
pub mod pool;
pub mod refinement;
pub mod repair;

pub use ablation::AblationAnalyzer;
pub use attempts::{select_best, AttemptRunner, EvaluatedAttempt};
pub use ensemble::EnsembleComposer;
pub use pipeline::{load_task, Pipeline, RunOutcome, RunReport, StageTiming};
pub use pool::CandidatePool;
pub use refinement::RefinementController;
pub use repair::{RepairLoop, RepairReport};
