use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagetree=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = commands::store_config(cli.client_id.as_deref());

    let result = match &cli.command {
        Commands::Import(args) => commands::import::run(args, config, cli.format),
        Commands::Show(args) => commands::show::run(args, config, cli.format),
        Commands::Check(args) => commands::check::run(args, config, cli.format),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
