//! One disbursement run
//!
//! A run logs the wallet identity and balance, then walks the recipient list
//! in file order: one transfer per entry, each followed by a random pause.
//! Per-recipient failures are logged and recorded; only a failure to read the
//! wallet identity or balance ends a run early.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ethers::types::TxHash;
use ethers::utils::format_ether;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::recipients::{checksummed, normalize_address, RecipientList};
use crate::wallet::ChainClient;

use super::amount::{Amount, AmountRange};

/// Bounds of the pause between two sends; `max` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..self.max)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), Duration::from_millis(3000))
    }
}

/// Outcome of one send, kept only long enough to log and count it
#[derive(Debug, Clone)]
pub struct TransferAttempt {
    pub recipient: String,
    pub amount: Option<Amount>,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
    pub success: bool,
    pub error: Option<String>,
}

impl TransferAttempt {
    fn new(recipient: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            amount: None,
            tx_hash: None,
            block_number: None,
            success: false,
            error: None,
        }
    }
}

/// Counts for a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            attempted: 0,
            succeeded: 0,
            failed: 0,
        }
    }

    fn record(&mut self, attempt: &TransferAttempt) {
        self.attempted += 1;
        if attempt.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Runtime knobs of a run, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub amounts: AmountRange,
    pub delays: DelayRange,
    pub token_symbol: String,
    /// Endpoint as shown in logs; callers pass it masked
    pub endpoint: String,
}

/// Sends one randomized transfer to every recipient per run
pub struct Disburser<C: ChainClient> {
    client: Arc<C>,
    recipients: RecipientList,
    settings: RunSettings,
    rng: Mutex<StdRng>,
}

impl<C: ChainClient> Disburser<C> {
    pub fn new(client: Arc<C>, recipients: RecipientList, settings: RunSettings) -> Self {
        Self {
            client,
            recipients,
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_config(client: Arc<C>, recipients: RecipientList, config: &Config) -> Result<Self> {
        let settings = RunSettings {
            amounts: config.amount_range()?,
            delays: config.delay_range(),
            token_symbol: config.token_symbol.clone(),
            endpoint: config.display_rpc_url(),
        };
        Ok(Self::new(client, recipients, settings))
    }

    /// Fix the random seed, for reproducible amounts and delays
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Perform one full pass over the recipient list
    ///
    /// Errors only when the wallet identity or balance cannot be read.
    pub async fn run(&self) -> Result<RunSummary> {
        let symbol = &self.settings.token_symbol;
        info!("Starting {} token distribution", symbol);
        info!("Using RPC URL: {}", self.settings.endpoint);

        let mut summary = RunSummary::new();

        let address = self.client.wallet_address().await?;
        let balance = self.client.balance(address).await?;
        info!("Wallet address: {}", checksummed(&address));
        info!("Wallet balance: {} {}", format_ether(balance), symbol);

        for recipient in self.recipients.iter() {
            let attempt = self.send_one(recipient).await;
            summary.record(&attempt);

            let delay = self.next_delay();
            sleep(delay).await;
        }

        summary.finished_at = Utc::now();
        info!("All transactions completed");
        Ok(summary)
    }

    /// [`run`](Self::run) with the run-level error logged instead of returned
    pub async fn run_logged(&self) -> Option<RunSummary> {
        match self.run().await {
            Ok(summary) => {
                info!(
                    "Run finished: {}/{} transfers confirmed, {} failed, took {}s",
                    summary.succeeded,
                    summary.attempted,
                    summary.failed,
                    (summary.finished_at - summary.started_at).num_seconds()
                );
                Some(summary)
            }
            Err(e) => {
                error!("Error in main process: {}", e);
                None
            }
        }
    }

    /// Send to a single recipient; never fails, the attempt carries the outcome
    pub async fn send_one(&self, recipient: &str) -> TransferAttempt {
        let mut attempt = TransferAttempt::new(recipient);

        if let Err(e) = self.try_send(recipient, &mut attempt).await {
            error!("Error sending to {}: {}", recipient, e);
            attempt.error = Some(e.to_string());
        }

        attempt
    }

    async fn try_send(&self, recipient: &str, attempt: &mut TransferAttempt) -> Result<()> {
        let to = normalize_address(recipient)?;
        let amount = self.next_amount()?;

        info!(
            "Sending {} {} to {}",
            amount,
            self.settings.token_symbol,
            checksummed(&to)
        );
        attempt.amount = Some(amount.clone());

        let tx_hash = self.client.send_value(to, amount.wei()).await?;
        info!("Transaction sent: {:?}", tx_hash);
        attempt.tx_hash = Some(tx_hash);

        let block = self.client.wait_for_confirmation(tx_hash).await?;
        info!("Transaction confirmed in block {}", block);
        attempt.block_number = Some(block);
        attempt.success = true;

        Ok(())
    }

    fn next_amount(&self) -> Result<Amount> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.settings.amounts.sample(&mut *rng)
    }

    fn next_delay(&self) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.settings.delays.sample(&mut *rng)
    }
}
