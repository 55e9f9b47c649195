//! `crucible run` — execute the full pipeline for a task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::{load_task, Pipeline, RunOutcome};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::Logger;
use crate::infrastructure::oracle::OpenRouterOracle;
use crate::infrastructure::sandbox::ProcessSandbox;

/// Arguments for `crucible run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task name (overrides the configured task)
    #[arg(long)]
    pub task: Option<String>,

    /// Model identifier (overrides the configured oracle model)
    #[arg(long)]
    pub model: Option<String>,

    /// Oracle API key (or set CRUCIBLE_ORACLE__API_KEY)
    #[arg(long, env = "CRUCIBLE_ORACLE__API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Number of seed solutions to generate
    #[arg(long)]
    pub num_seeds: Option<usize>,
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    apply_overrides(&mut config, &args);

    let _logger = Logger::init(&config.logging)?;

    let task = load_task(&config.task).await;
    println!(
        "{} task {} (metric {}, {})",
        style("crucible").cyan().bold(),
        style(&task.name).bold(),
        task.metric,
        task.direction.as_str()
    );

    let oracle = Arc::new(OpenRouterOracle::new(&config.oracle)?);
    let sandbox_root = Path::new(&config.task.workspace_dir)
        .join(&task.name)
        .join("artifacts");
    let executor = Arc::new(
        ProcessSandbox::new(&config.sandbox, sandbox_root)
            .context("failed to prepare sandbox workspace")?
            .with_dataset_dir(task.dataset_dir.clone()),
    );

    let pipeline = Pipeline::new(config, task, oracle, executor);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} [{elapsed}]")
            .expect("Invalid spinner template"),
    );
    spinner.set_message("searching...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = pipeline.run().await;
    spinner.finish_and_clear();

    let outcome = outcome?;
    print_summary(&outcome);
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(ref task) = args.task {
        config.task.name.clone_from(task);
    }
    if let Some(ref model) = args.model {
        config.oracle.model.clone_from(model);
    }
    if let Some(ref key) = args.api_key {
        config.oracle.api_key = Some(key.clone());
    }
    if let Some(n) = args.num_seeds {
        config.search.num_seed_solutions = n;
    }
}

fn print_summary(outcome: &RunOutcome) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "round", "stage", "target", "attempts", "ok", "improved", "best after",
    ]);
    for round in &outcome.report.rounds {
        table.add_row(vec![
            Cell::new(round.round),
            Cell::new(round.stage.as_str()),
            Cell::new(round.target_region.as_deref().unwrap_or("-")),
            Cell::new(round.attempts.len()),
            Cell::new(round.successful_attempts()),
            Cell::new(if round.improved { "yes" } else { "no" }),
            Cell::new(
                round
                    .best_score_after
                    .map_or_else(|| "-".to_string(), |s| format!("{s:.5}")),
            ),
        ]);
    }
    println!("{table}");
    println!(
        "{} {:.5} ({})",
        style("best score:").green().bold(),
        outcome.best_score,
        if outcome.best.is_ensemble() {
            "ensemble"
        } else {
            "single solution"
        }
    );
    println!("solution written to {}", outcome.solution_path.display());
    println!("report written to {}", outcome.report_path.display());
}
