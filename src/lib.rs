//! TEA Disburser Library
//!
//! Sends randomized amounts of a chain's native token from one funded wallet
//! to every address in a list, on a fixed schedule.

pub mod cli;
pub mod config;
pub mod disburse;
pub mod error;
pub mod recipients;
pub mod wallet;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
