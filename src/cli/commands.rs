//! CLI command implementations

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::disburse::{Disburser, Scheduler};
use crate::recipients::{checksummed, normalize_address, RecipientList};
use crate::wallet::{ChainClient, TransferExecutor};

/// Load the recipient list and build the disburser
///
/// The configuration (and with it the credential) is already validated by the
/// time this opens the address file.
fn prepare(config: &Config) -> Result<Disburser<TransferExecutor>> {
    let recipients = RecipientList::load(&config.address_file)?;
    let client = Arc::new(TransferExecutor::from_config(config)?);
    Ok(Disburser::from_config(client, recipients, config)?)
}

/// Run the disbursement loop on its schedule until Ctrl-C
pub async fn start(config: &Config) -> Result<()> {
    let disburser = Arc::new(prepare(config)?);

    let scheduler = Scheduler::new(config.interval(), config.overlap_policy)
        .with_run_timeout(config.run_timeout());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, exiting...");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                // Keep the sender alive so the scheduler keeps running
                std::future::pending::<()>().await;
            }
        }
    });

    scheduler
        .run(
            move || {
                let disburser = disburser.clone();
                async move {
                    disburser.run_logged().await;
                }
            },
            shutdown_rx,
        )
        .await;

    Ok(())
}

/// Perform a single run and exit
pub async fn once(config: &Config) -> Result<()> {
    let disburser = prepare(config)?;
    let summary = disburser.run().await?;

    info!(
        "Run finished: {}/{} transfers confirmed, {} failed",
        summary.succeeded, summary.attempted, summary.failed
    );
    if summary.failed > 0 {
        warn!("{} transfer(s) failed, see errors above", summary.failed);
    }

    Ok(())
}

/// Show the funding wallet and its balance
pub async fn balance(config: &Config) -> Result<()> {
    let client = TransferExecutor::from_config(config)?;

    let address = client.wallet_address().await?;
    let balance = client.balance(address).await?;

    println!("Wallet address: {}", checksummed(&address));
    println!(
        "Wallet balance: {} {}",
        ethers::utils::format_ether(balance),
        config.token_symbol
    );

    Ok(())
}

/// Print the normalized recipient list without touching the network
pub fn recipients(config: &Config) -> Result<()> {
    let list = RecipientList::load(&config.address_file)?;

    println!("\nRecipients ({}):", list.source().display());
    println!("{:<5} {:<44} {}", "NO.", "ADDRESS", "STATUS");
    println!("{}", "-".repeat(80));

    let mut invalid = 0;
    for (i, entry) in list.iter().enumerate() {
        match normalize_address(entry) {
            Ok(address) => println!("{:<5} {:<44} OK", i + 1, checksummed(&address)),
            Err(e) => {
                invalid += 1;
                println!("{:<5} {:<44} INVALID ({})", i + 1, entry, e);
            }
        }
    }

    println!("\nTotal: {}, valid: {}, invalid: {}", list.len(), list.len() - invalid, invalid);
    Ok(())
}

/// Show configuration with secrets masked
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}
