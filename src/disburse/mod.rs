//! Disbursement runs and their schedule
//!
//! ```text
//! Scheduler ──tick──▶ Disburser::run ──per recipient──▶ ChainClient
//!                          │
//!                     AmountRange / DelayRange
//! ```

pub mod amount;
pub mod runner;
pub mod scheduler;

pub use amount::{Amount, AmountRange};
pub use runner::{DelayRange, Disburser, RunSettings, RunSummary, TransferAttempt};
pub use scheduler::{Scheduler, SchedulerStats};
