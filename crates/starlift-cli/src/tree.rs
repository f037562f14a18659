//! `starlift tree` — render the live instance/platform tree.

use clap::Args;

use crate::client::{ClientError, CoordinatorClient};

/// Arguments for the `tree` subcommand.
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Force whose tree to show.
    #[arg(long, default_value = "player")]
    pub force: String,
}

/// Fetch and print the tree.
pub async fn run_tree(client: &CoordinatorClient, args: &TreeArgs) -> Result<(), ClientError> {
    let tree = client
        .get_json(&format!("/v1/tree?force={}", args.force))
        .await?;

    println!("force: {}", args.force);
    let instances = tree["instances"].as_array().cloned().unwrap_or_default();
    if instances.is_empty() {
        println!("  (no instances known)");
        return Ok(());
    }

    for instance in instances {
        println!(
            "  [{}] {} ({})",
            instance["instanceId"],
            instance["instanceName"].as_str().unwrap_or("?"),
            instance["status"].as_str().unwrap_or("?"),
        );
        let platforms = instance["platforms"].as_array().cloned().unwrap_or_default();
        if platforms.is_empty() {
            println!("      (no platforms)");
            continue;
        }
        for platform in platforms {
            println!(
                "      #{} {}",
                platform["platformIndex"],
                platform["platformName"].as_str().unwrap_or("?"),
            );
        }
    }
    Ok(())
}
