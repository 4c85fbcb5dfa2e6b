// ABOUTME: Entry point for the dockgate CLI application.
// ABOUTME: Parses arguments and dispatches to the serve, check, and config commands.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use dockgate::app;
use dockgate::config::Config;
use dockgate::error::Result;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // -v forces debug; otherwise honour RUST_LOG, defaulting to info
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(&path),
        None => Config::discover(&env::current_dir()?),
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { config, listen } => app::serve(load_config(config)?, listen).await,
        Commands::Check { config } => {
            let config = load_config(config)?;
            let results = app::check(&config).await?;
            for (id, reachable) in &results {
                let state = if *reachable { "reachable" } else { "UNREACHABLE" };
                println!("{id}\t{state}");
            }
            app::require_reachable(&results)
        }
        Commands::Config {
            command: ConfigCommands::List { config },
        } => {
            let config = load_config(config)?;
            for entity in app::list_configs(&config).await? {
                let access = if entity.read_only { "static" } else { "stored" };
                println!("{}\t{}\t{}", entity.id, access, entity.config.target);
            }
            Ok(())
        }
    }
}
