//! Artifact executor port.
//!
//! The seam between the orchestration logic and untrusted generated code.
//! Implementations run one artifact in isolation and always come back with
//! a structured `ExecutionResult`; faults raised by the executed code are
//! caught at the sandbox boundary and reported as a `Failed` result, never
//! as an `Err` into the controller.

use async_trait::async_trait;

use crate::domain::models::{CodeArtifact, ExecutionResult};

/// Port for sandboxed execution of generated code.
#[async_trait]
pub trait ArtifactExecutor: Send + Sync {
    /// Run `artifact` in an isolated working directory and return the
    /// structured outcome. Infrastructure faults on the sandbox's own side
    /// (workspace I/O, spawn errors) are also folded into a `Failed`
    /// result so a single bad attempt can never abort the search.
    async fn execute(&self, artifact: &CodeArtifact) -> ExecutionResult;
}
