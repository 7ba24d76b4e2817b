//! Recording chain double for run and scheduler tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use tokio::time::Instant;

use crate::error::{Error, Result};

use super::transfer::ChainClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    Balance,
    Send { to: Address, value: U256 },
    Confirm { tx_hash: TxHash },
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub at: Instant,
}

pub struct MockChain {
    address: Address,
    balance: U256,
    fail_balance: bool,
    failing_sends: HashSet<Address>,
    reverting: HashSet<Address>,
    reverted_hashes: Mutex<HashSet<TxHash>>,
    confirmation_delay: Duration,
    next_hash: AtomicU64,
    calls: Mutex<Vec<Call>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            address: Address::repeat_byte(0xaa),
            balance: U256::exp10(18),
            fail_balance: false,
            failing_sends: HashSet::new(),
            reverting: HashSet::new(),
            reverted_hashes: Mutex::new(HashSet::new()),
            confirmation_delay: Duration::ZERO,
            next_hash: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_balance(mut self) -> Self {
        self.fail_balance = true;
        self
    }

    pub fn failing_send(mut self, to: Address) -> Self {
        self.failing_sends.insert(to);
        self
    }

    pub fn reverting(mut self, to: Address) -> Self {
        self.reverting.insert(to);
        self
    }

    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn balance_calls(&self) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == CallKind::Balance)
            .map(|c| c.at)
            .collect()
    }

    pub fn sends(&self) -> Vec<(Address, U256, Instant)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c.kind {
                CallKind::Send { to, value } => Some((to, value, c.at)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, kind: CallKind) {
        self.calls.lock().unwrap().push(Call {
            kind,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn wallet_address(&self) -> Result<Address> {
        Ok(self.address)
    }

    async fn balance(&self, _address: Address) -> Result<U256> {
        self.record(CallKind::Balance);
        if self.fail_balance {
            return Err(Error::Rpc("balance unavailable".to_string()));
        }
        Ok(self.balance)
    }

    async fn send_value(&self, to: Address, value: U256) -> Result<TxHash> {
        self.record(CallKind::Send { to, value });
        if self.failing_sends.contains(&to) {
            return Err(Error::TransactionSend("insufficient funds".to_string()));
        }

        let tx_hash = TxHash::from_low_u64_be(self.next_hash.fetch_add(1, Ordering::SeqCst));
        if self.reverting.contains(&to) {
            self.reverted_hashes.lock().unwrap().insert(tx_hash);
        }
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<u64> {
        self.record(CallKind::Confirm { tx_hash });
        tokio::time::sleep(self.confirmation_delay).await;

        if self.reverted_hashes.lock().unwrap().contains(&tx_hash) {
            return Err(Error::TransactionReverted(format!("{:?}", tx_hash)));
        }
        Ok(100 + tx_hash.to_low_u64_be())
    }
}
