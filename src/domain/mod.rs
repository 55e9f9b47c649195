//! Domain layer: pure models, ports, and error taxonomy.

pub mod error;
pub mod models;
pub mod ports;

pub use error::PipelineError;
