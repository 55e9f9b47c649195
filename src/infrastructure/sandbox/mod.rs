//! Sandboxed execution engine.

pub mod executor;
pub mod score;

pub use executor::ProcessSandbox;
pub use score::{extract_score, SCORE_SENTINEL};
