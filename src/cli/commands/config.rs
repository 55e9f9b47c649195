//! `crucible config` — inspect the resolved configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::infrastructure::config::ConfigLoader;

/// Arguments for `crucible config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the built-in defaults instead of the resolved configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Print the configuration as YAML after merging file and environment.
pub fn execute(args: &ConfigArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = if args.defaults {
        crate::domain::models::Config::default()
    } else {
        match config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        }
    };
    let yaml = serde_yaml::to_string(&config).context("failed to render configuration")?;
    print!("{yaml}");
    Ok(())
}
