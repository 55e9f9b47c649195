//! Command implementations for the crucible CLI.

pub mod config;
pub mod run;
