//! Randomized transfer amounts
//!
//! Amounts are drawn uniformly from `[min, max)` in whole tokens, rounded to 6
//! decimal places, then converted to wei (18 decimals).

use std::fmt;

use ethers::types::U256;
use ethers::utils::parse_ether;
use rand::Rng;

use crate::error::{Error, Result};

/// Decimal places kept when formatting a sampled amount
pub const AMOUNT_DECIMALS: usize = 6;

/// Validated amount bounds, in whole tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    min: f64,
    max: f64,
}

impl AmountRange {
    /// Fails when either bound is negative or not finite, or when min > max
    pub fn new(min: f64, max: f64) -> Result<Self> {
        for value in [min, max] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidAmount {
                    value: value.to_string(),
                    reason: "must be a finite, non-negative decimal".to_string(),
                });
            }
        }

        if min > max {
            return Err(Error::AmountRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }

        Ok(Self { min, max })
    }

    /// Parse decimal-string bounds such as `"0.001"` and `"0.01"`
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        Self::new(parse_decimal(min)?, parse_decimal(max)?)
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Draw a raw value in `[min, max)`; exactly `min` when the range is a point
    pub fn sample_tokens<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..self.max)
    }

    /// Draw an amount ready for a transfer
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Amount> {
        Amount::from_tokens(self.sample_tokens(rng))
    }
}

fn parse_decimal(raw: &str) -> Result<f64> {
    raw.trim().parse::<f64>().map_err(|e| Error::InvalidAmount {
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// A transfer amount: the 6-decimal display form and its value in wei
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    display: String,
    wei: U256,
}

impl Amount {
    pub fn from_tokens(tokens: f64) -> Result<Self> {
        let display = format!("{:.*}", AMOUNT_DECIMALS, tokens);
        let wei = parse_ether(&display).map_err(|e| Error::InvalidAmount {
            value: display.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { display, wei })
    }

    pub fn wei(&self) -> U256 {
        self.wei
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
