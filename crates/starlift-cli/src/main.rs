//! # starlift CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! All subcommands talk to a running coordinator over its HTTP control
//! plane.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use starlift_cli::exports::{run_exports, ExportsArgs};
use starlift_cli::logs::{run_logs, LogsArgs};
use starlift_cli::transfers::{run_transfers, TransfersArgs};
use starlift_cli::tree::{run_tree, TreeArgs};
use starlift_cli::CoordinatorClient;

/// Starlift operator CLI.
///
/// Inspect the cluster's platform tree, staged exports, and transaction
/// logs, and start platform transfers between instances.
#[derive(Parser, Debug)]
#[command(name = "starlift", version, about, long_about = None)]
struct Cli {
    /// Coordinator base URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8440")]
    coordinator: String,

    /// Bearer token (defaults to $STARLIFT_AUTH_TOKEN).
    #[arg(long, global = true)]
    token: Option<String>,

    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the live instance/platform tree.
    Tree(TreeArgs),

    /// Inspect staged exports.
    Exports(ExportsArgs),

    /// Start and follow platform transfers.
    Transfers(TransfersArgs),

    /// Query the transaction log.
    Logs(LogsArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let token = cli
        .token
        .or_else(|| std::env::var("STARLIFT_AUTH_TOKEN").ok());
    let client = match CoordinatorClient::new(&cli.coordinator, token) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = match &cli.command {
        Commands::Tree(args) => run_tree(&client, args).await,
        Commands::Exports(args) => run_exports(&client, args).await,
        Commands::Transfers(args) => run_transfers(&client, args).await,
        Commands::Logs(args) => run_logs(&client, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
