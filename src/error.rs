//! Error types for the disburser

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the disburser
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} is required in .env file")]
    MissingEnvVar(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    // Recipient list errors
    #[error("{0} not found!")]
    AddressFileNotFound(String),

    #[error("No addresses found in {0}")]
    EmptyAddressList(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    // Amount errors
    #[error("Invalid amount {value}: {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Invalid amount range: min {min} is greater than max {max}")]
    AmountRange { min: String, max: String },

    // RPC errors
    #[error("RPC error: {0}")]
    Rpc(String),

    // Transfer errors
    #[error("Transaction send failed: {0}")]
    TransactionSend(String),

    #[error("Transaction {0} reverted")]
    TransactionReverted(String),

    #[error("Transaction {tx_hash} not confirmed after {secs}s")]
    ConfirmationTimeout { tx_hash: String, secs: u64 },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<ethers::providers::ProviderError> for Error {
    fn from(e: ethers::providers::ProviderError) -> Self {
        Error::Rpc(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
