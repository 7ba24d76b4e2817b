//! Native token transfer execution
//!
//! Handles the actual on-chain value transfers from the funding wallet.

use std::time::Duration;

use async_trait::async_trait;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionRequest, TxHash, U256, U64};
use tokio::sync::OnceCell;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

use super::signer::load_signer;

/// Chain operations needed by a disbursement run
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the funding wallet
    async fn wallet_address(&self) -> Result<Address>;

    /// Balance of an address in wei
    async fn balance(&self, address: Address) -> Result<U256>;

    /// Broadcast a plain value transfer from the funding wallet
    async fn send_value(&self, to: Address, value: U256) -> Result<TxHash>;

    /// Block until the transaction is included; returns its block number
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<u64>;
}

type SignerClient<P> = SignerMiddleware<Provider<P>, LocalWallet>;

/// Transfer executor backed by a JSON-RPC node, over HTTP unless told otherwise
pub struct TransferExecutor<P: JsonRpcClient = Http> {
    provider: Provider<P>,
    wallet: LocalWallet,
    /// Signing client, built on first use once the chain id is known
    client: OnceCell<SignerClient<P>>,
    receipt_poll: Duration,
    confirmation_timeout: Option<Duration>,
}

impl TransferExecutor<Http> {
    /// Create a new transfer executor
    ///
    /// No network access happens here; the chain id is fetched lazily so a
    /// node outage only fails the run that hits it.
    pub fn new(
        rpc_url: &str,
        wallet: LocalWallet,
        receipt_poll: Duration,
        confirmation_timeout: Option<Duration>,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Error::Config(format!("Invalid RPC_URL {}: {}", rpc_url, e)))?;

        Ok(Self::with_provider(
            provider,
            wallet,
            receipt_poll,
            confirmation_timeout,
        ))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let wallet = load_signer(config.credential()?)?;
        Self::new(
            &config.rpc_url,
            wallet,
            config.receipt_poll_interval(),
            config.confirmation_timeout(),
        )
    }
}

impl<P: JsonRpcClient + Clone + 'static> TransferExecutor<P> {
    pub fn with_provider(
        provider: Provider<P>,
        wallet: LocalWallet,
        receipt_poll: Duration,
        confirmation_timeout: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            wallet,
            client: OnceCell::new(),
            receipt_poll,
            confirmation_timeout,
        }
    }

    async fn signer_client(&self) -> Result<&SignerClient<P>> {
        self.client
            .get_or_try_init(|| async {
                let chain_id = self.provider.get_chainid().await?;
                info!("Connected to chain {}", chain_id);

                let wallet = self.wallet.clone().with_chain_id(chain_id.as_u64());
                Ok::<_, Error>(SignerMiddleware::new(self.provider.clone(), wallet))
            })
            .await
    }
}

#[async_trait]
impl<P: JsonRpcClient + Clone + 'static> ChainClient for TransferExecutor<P> {
    async fn wallet_address(&self) -> Result<Address> {
        Ok(self.wallet.address())
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| Error::Rpc(format!("Failed to get balance: {}", e)))
    }

    async fn send_value(&self, to: Address, value: U256) -> Result<TxHash> {
        debug!("Executing transfer: {} wei from {:?} to {:?}", value, self.wallet.address(), to);

        let client = self.signer_client().await?;
        let tx = TransactionRequest::new()
            .from(self.wallet.address())
            .to(to)
            .value(value);

        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| Error::TransactionSend(e.to_string()))?;

        Ok(pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<u64> {
        let started = Instant::now();

        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                if receipt.status == Some(U64::zero()) {
                    return Err(Error::TransactionReverted(format!("{:?}", tx_hash)));
                }
                if let Some(block) = receipt.block_number {
                    return Ok(block.as_u64());
                }
            }

            if let Some(limit) = self.confirmation_timeout {
                if started.elapsed() >= limit {
                    return Err(Error::ConfirmationTimeout {
                        tx_hash: format!("{:?}", tx_hash),
                        secs: limit.as_secs(),
                    });
                }
            }

            sleep(self.receipt_poll).await;
        }
    }
}
