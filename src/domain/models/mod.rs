//! Domain models: pure data structures with no I/O.

pub mod ablation;
pub mod artifact;
pub mod config;
pub mod execution;
pub mod round;
pub mod task;

pub use ablation::{
    disable_region, split_regions, AblationReport, CodeRegion, RegionImpact, REGION_MARKER_PREFIX,
    UNPARTITIONED_REGION,
};
pub use artifact::{ArtifactOrigin, CodeArtifact};
pub use config::{
    Config, LoggingConfig, OracleConfig, SandboxConfig, SearchConfig, TaskConfig,
};
pub use execution::{ExecutionResult, ExecutionStatus};
pub use round::{AttemptRecord, RefinementRound, RoundStage};
pub use task::{MetricDirection, TaskSpec};
