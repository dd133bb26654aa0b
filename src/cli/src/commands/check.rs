//! Health check command.
//!
//! Queries the health endpoint and displays per-probe status.

use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct CheckArgs {
    /// Include per-probe results
    #[arg(short, long)]
    detailed: bool,

    /// Path of the health endpoint
    #[arg(long)]
    path: Option<String>,
}

/// Returns whether the service reported UP.
pub async fn execute(args: CheckArgs, client: &ApiClient, format: OutputFormat) -> Result<bool> {
    let path = args
        .path
        .or_else(|| super::config::load_value("health-path"))
        .unwrap_or_else(|| "/health".to_string());
    let health = client.get_health(&path).await?;

    match format {
        OutputFormat::Table => {
            output::print_header("Service Health");
            output::print_detail("Status", &output::status_badge(&health.status).to_string());
            output::print_detail("Endpoint", &format!("{}{}", client.base_url(), path));

            if args.detailed {
                println!();
                output::print_list(&health.checks, format);
            }

            if health.is_up() {
                output::print_success("All probes passing");
            } else {
                let failing: Vec<&str> = health
                    .checks
                    .iter()
                    .filter(|c| c.status != "UP")
                    .map(|c| c.name.as_str())
                    .collect();
                output::print_error(&format!("Service is DOWN: {}", failing.join(", ")));
            }
        }
        _ => output::print_item(&health, format),
    }

    Ok(health.is_up())
}
