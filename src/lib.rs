//! Crucible - Autonomous ML Engineering Pipeline
//!
//! Crucible searches for machine-learning solution code by iterating
//! propose, execute, measure, and refine steps against a sandboxed
//! interpreter, then blends the strongest candidates into an ensemble.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, ports, and search semantics
//! - **Application Layer** (`application`): Pipeline stages and the candidate pool
//! - **Infrastructure Layer** (`infrastructure`): Oracle client, process sandbox, config, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use crucible::application::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Build collaborators and run the pipeline
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use application::{
    AblationAnalyzer, AttemptRunner, CandidatePool, EnsembleComposer, Pipeline,
    RefinementController, RepairLoop, RunOutcome, RunReport,
};
pub use domain::models::{
    AblationReport, CodeArtifact, Config, ExecutionResult, ExecutionStatus, MetricDirection,
    RefinementRound, RegionImpact, RoundStage, TaskSpec,
};
pub use domain::ports::{ArtifactExecutor, OracleError, ProposalKind, SynthesisOracle};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::oracle::OpenRouterOracle;
pub use infrastructure::sandbox::ProcessSandbox;
