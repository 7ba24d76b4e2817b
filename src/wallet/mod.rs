//! Wallet and chain access
//!
//! A single funding wallet, derived from the configured private key, signs
//! every transfer. Runs talk to the chain only through [`ChainClient`], so the
//! JSON-RPC backed [`TransferExecutor`] can be swapped for a test double.

pub mod signer;
pub mod transfer;

#[cfg(test)]
pub mod mock;

pub use signer::load_signer;
pub use transfer::{ChainClient, TransferExecutor};
