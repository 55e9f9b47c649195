//! Crucible CLI entry point.

use clap::Parser;

use crucible::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => crucible::cli::commands::run::execute(args, cli.config).await,
        Commands::Config(args) => crucible::cli::commands::config::execute(&args, cli.config),
    };

    if let Err(err) = result {
        crucible::cli::handle_error(err);
    }
}
