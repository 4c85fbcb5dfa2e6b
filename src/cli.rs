// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockgate")]
#[command(about = "One HTTP and WebSocket API for many Docker daemons")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway
    Serve {
        /// Path to the configuration file (default: discovered in the working directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the listen address from the configuration
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Ping every configured daemon and exit non-zero if any is unreachable
    Check {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Inspect configured daemons
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// List every configured daemon with credentials masked
    List {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
