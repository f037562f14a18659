//! `starlift transfers` — start and follow platform transfers.

use clap::{Args, Subcommand};
use serde_json::json;

use crate::client::{ClientError, CoordinatorClient};

/// Arguments for the `transfers` subcommand.
#[derive(Args, Debug)]
pub struct TransfersArgs {
    #[command(subcommand)]
    pub command: TransfersCommand,
}

/// Transfer operations.
#[derive(Subcommand, Debug)]
pub enum TransfersCommand {
    /// List transfer summaries, newest first.
    List {
        /// Maximum number of summaries.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Export a live platform and transfer it in one shot.
    Start {
        /// Source instance id.
        #[arg(long)]
        source: u32,
        /// Target instance, by id or name.
        #[arg(long)]
        target: String,
        /// Platform slot index on the source (1-based).
        #[arg(long)]
        platform: u32,
        /// Owning force.
        #[arg(long, default_value = "player")]
        force: String,
    },
    /// Transfer an already-staged export.
    FromExport {
        /// The staged export id.
        #[arg(long)]
        export: String,
        /// Target instance, by id or name.
        #[arg(long)]
        target: String,
    },
}

/// Dispatch the `transfers` subcommand.
pub async fn run_transfers(
    client: &CoordinatorClient,
    args: &TransfersArgs,
) -> Result<(), ClientError> {
    match &args.command {
        TransfersCommand::List { limit } => {
            let body = client
                .get_json(&format!("/v1/transfers?limit={limit}"))
                .await?;
            let transfers = body["transfers"].as_array().cloned().unwrap_or_default();
            if transfers.is_empty() {
                println!("no transfers recorded");
                return Ok(());
            }
            for transfer in transfers {
                println!(
                    "{}  {:12}  {}  {} -> {}",
                    transfer["transferId"].as_str().unwrap_or("?"),
                    transfer["status"].as_str().unwrap_or("?"),
                    transfer["platformName"].as_str().unwrap_or("?"),
                    transfer["sourceInstanceName"].as_str().unwrap_or("?"),
                    transfer["targetInstanceName"].as_str().unwrap_or("?"),
                );
            }
        }
        TransfersCommand::Start {
            source,
            target,
            platform,
            force,
        } => {
            let body = client
                .post_json(
                    "/v1/transfers/start",
                    &json!({
                        "sourceInstanceId": source,
                        "targetInstanceId": target_ref(target),
                        "sourcePlatformIndex": platform,
                        "forceName": force,
                    }),
                )
                .await?;
            println!(
                "transfer started: {}",
                body["transferId"].as_str().unwrap_or("?")
            );
        }
        TransfersCommand::FromExport { export, target } => {
            let body = client
                .post_json(
                    "/v1/transfers",
                    &json!({
                        "exportId": export,
                        "targetInstanceId": target_ref(target),
                    }),
                )
                .await?;
            println!(
                "transfer started: {}",
                body["transferId"].as_str().unwrap_or("?")
            );
        }
    }
    Ok(())
}

/// Targets may be given by numeric id or by name; the API accepts both
/// forms but as distinct JSON types.
fn target_ref(target: &str) -> serde_json::Value {
    match target.parse::<u32>() {
        Ok(id) => json!(id),
        Err(_) => json!(target),
    }
}
