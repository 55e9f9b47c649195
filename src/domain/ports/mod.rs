//! Ports: trait seams between the domain and the outside world.

pub mod executor;
pub mod oracle;

pub use executor::ArtifactExecutor;
pub use oracle::{OracleError, ProposalKind, ProposeRequest, SynthesisOracle};
