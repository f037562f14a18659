//! `starlift logs` — query the transaction log.

use clap::{Args, Subcommand};

use crate::client::{ClientError, CoordinatorClient};

/// Arguments for the `logs` subcommand.
#[derive(Args, Debug)]
pub struct LogsArgs {
    #[command(subcommand)]
    pub command: LogsCommand,
}

/// Transaction-log operations.
#[derive(Subcommand, Debug)]
pub enum LogsCommand {
    /// List transaction-log summaries, newest first.
    List {
        /// Maximum number of summaries.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print one transfer's full event stream.
    Get {
        /// The transfer id.
        id: String,
    },
}

/// Dispatch the `logs` subcommand.
pub async fn run_logs(client: &CoordinatorClient, args: &LogsArgs) -> Result<(), ClientError> {
    match &args.command {
        LogsCommand::List { limit } => {
            let body = client.get_json(&format!("/v1/logs?limit={limit}")).await?;
            let logs = body["logs"].as_array().cloned().unwrap_or_default();
            if logs.is_empty() {
                println!("no transaction logs recorded");
                return Ok(());
            }
            for summary in logs {
                println!(
                    "{}  {:11}  {}  {}",
                    summary["transferId"].as_str().unwrap_or("?"),
                    summary["result"].as_str().unwrap_or("?"),
                    summary["platformName"].as_str().unwrap_or("?"),
                    summary["totalDuration"].as_str().unwrap_or(""),
                );
            }
        }
        LogsCommand::Get { id } => {
            let record = client.get_json(&format!("/v1/logs/{id}")).await?;
            let events = record["events"].as_array().cloned().unwrap_or_default();
            println!(
                "transfer {}  result={}",
                id,
                record["summary"]["result"].as_str().unwrap_or("?")
            );
            for event in events {
                println!(
                    "  {}  +{:>6}ms  {:20}  {}",
                    event["timestamp"].as_str().unwrap_or("?"),
                    event["elapsedMs"],
                    event["eventType"].as_str().unwrap_or("?"),
                    event["message"].as_str().unwrap_or(""),
                );
            }
        }
    }
    Ok(())
}
