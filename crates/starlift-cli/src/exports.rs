//! `starlift exports` — inspect staged exports.

use clap::{Args, Subcommand};

use crate::client::{ClientError, CoordinatorClient};

/// Arguments for the `exports` subcommand.
#[derive(Args, Debug)]
pub struct ExportsArgs {
    #[command(subcommand)]
    pub command: ExportsCommand,
}

/// Export operations.
#[derive(Subcommand, Debug)]
pub enum ExportsCommand {
    /// List staged exports, newest first.
    List,
    /// Download one export, payload included, as JSON on stdout.
    Get {
        /// The export id.
        id: String,
    },
}

/// Dispatch the `exports` subcommand.
pub async fn run_exports(
    client: &CoordinatorClient,
    args: &ExportsArgs,
) -> Result<(), ClientError> {
    match &args.command {
        ExportsCommand::List => {
            let body = client.get_json("/v1/exports").await?;
            let exports = body["exports"].as_array().cloned().unwrap_or_default();
            if exports.is_empty() {
                println!("no exports staged");
                return Ok(());
            }
            for export in exports {
                println!(
                    "{}  {}  source={}  {} bytes",
                    export["exportId"].as_str().unwrap_or("?"),
                    export["platformName"].as_str().unwrap_or("?"),
                    export["sourceInstanceId"],
                    export["size"],
                );
            }
        }
        ExportsCommand::Get { id } => {
            let record = client.get_json(&format!("/v1/exports/{id}")).await?;
            println!("{}", serde_json::to_string_pretty(&record).unwrap_or_default());
        }
    }
    Ok(())
}
