//! Vitals CLI - Command-line interface for Vitals health endpoints.
//!
//! Provides commands for checking service health and managing CLI configuration.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check, config};
use output::OutputFormat;

/// Exit code when the service answered but reported DOWN.
const EXIT_DOWN: i32 = 2;

/// Vitals - Aggregated service health CLI
#[derive(Parser)]
#[command(
    name = "vitals",
    author = "Aezi <aezi.zhu@icloud.com>",
    version = "0.1.0",
    about = "Vitals - Aggregated service health",
    long_about = "CLI tool for querying Vitals health endpoints and managing CLI configuration.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Server URL
    #[arg(long, global = true, env = "VITALS_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health (exits 2 when DOWN)
    Check(check::CheckArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let format = cli.output;

    let result = match cli.command {
        Commands::Check(args) => {
            let api_url = cli
                .api_url
                .clone()
                .or_else(|| config::load_value("api-url"))
                .unwrap_or_else(|| "http://localhost:8080".to_string());
            let client = client::ApiClient::new(&api_url)?;
            check::execute(args, &client, format).await
        }
        Commands::Config(cmd) => config::execute(cmd, format).await.map(|()| true),
    };

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(EXIT_DOWN),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}
