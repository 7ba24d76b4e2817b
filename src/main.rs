//! TEA Disburser - scheduled native token disbursement
//!
//! # WARNING
//! - Every run spends real funds from the configured wallet.
//! - Transfers are not retried and progress is not persisted; a restart
//!   starts over from the first address.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

// Use the library crate
use tea_disburser::cli::commands;
use tea_disburser::config::Config;

/// TEA Disburser - randomized token transfers to a recipient list
#[derive(Parser)]
#[command(name = "tea-disburser")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to optional config file; environment variables take precedence
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run immediately, then on every interval until Ctrl-C (default)
    Start,

    /// Perform a single run and exit
    Once,

    /// Show the funding wallet address and balance
    Balance,

    /// Validate and list the recipient addresses (no network access)
    Recipients,

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tea_disburser=info".parse()?),
        )
        .with_target(false)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration; a missing credential stops us here, before the
    // address file is opened
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let command = cli.command.unwrap_or(Commands::Start);
    if matches!(command, Commands::Start) {
        info!("Will run every {} minutes", config.interval_minutes);
    }

    // Execute command
    let result = match command {
        Commands::Start => commands::start(&config).await,
        Commands::Once => commands::once(&config).await,
        Commands::Balance => commands::balance(&config).await,
        Commands::Recipients => commands::recipients(&config),
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
