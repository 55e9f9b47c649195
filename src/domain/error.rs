//! Pipeline-level error taxonomy.
//!
//! Execution failures, timeouts, unparseable scores, and oracle failures
//! are all recovered locally inside the search loop and never surface
//! here. The variants below are the genuinely fatal conditions.

use thiserror::Error;

/// Fatal pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Every seed candidate failed even after repair; there is nothing to
    /// refine and no submission can be produced.
    #[error("no solution found: no seed candidate ever executed successfully")]
    NoSolutionFound,

    /// The workspace directory could not be prepared.
    #[error("failed to prepare workspace at {path}: {source}")]
    Workspace {
        /// Workspace path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The run report or final artifact could not be written.
    #[error("failed to write run output {path}: {source}")]
    Output {
        /// Output path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
