//! Recipient list loading and address normalization
//!
//! The list file holds one address per line. Lines are trimmed and blank lines
//! dropped; order and duplicates are kept. Entries are only normalized when a
//! transfer is attempted, so one malformed line never fails the whole list.

use std::path::{Path, PathBuf};

use ethers::types::Address;
use ethers::utils::to_checksum;
use tracing::info;

use crate::error::{Error, Result};

/// Ordered, non-empty list of raw recipient strings
#[derive(Debug, Clone)]
pub struct RecipientList {
    source: PathBuf,
    entries: Vec<String>,
}

impl RecipientList {
    /// Load the list from a file
    ///
    /// Fails if the file does not exist or contains no non-blank lines.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::AddressFileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let list = Self::parse(path, &content)?;

        info!("Loaded {} recipient addresses", list.len());
        Ok(list)
    }

    /// Build the list from file contents; `source` is only used in messages
    pub fn parse(source: &Path, content: &str) -> Result<Self> {
        let entries: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if entries.is_empty() {
            return Err(Error::EmptyAddressList(source.display().to_string()));
        }

        Ok(Self {
            source: source.to_path_buf(),
            entries,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Parse and checksum-validate an address (EIP-55)
///
/// Accepts an optional `0x` prefix. All-lowercase and all-uppercase input is
/// accepted as is; mixed case must carry a correct checksum.
pub fn normalize_address(raw: &str) -> Result<Address> {
    let invalid = |reason: &str| Error::InvalidAddress {
        address: raw.to_string(),
        reason: reason.to_string(),
    };

    let body = raw.strip_prefix("0x").unwrap_or(raw);
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid("expected 40 hex digits"));
    }

    let address: Address = body.parse().map_err(|_| invalid("not a hex address"))?;

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None)[2..] != *body {
        return Err(invalid("bad address checksum"));
    }

    Ok(address)
}

/// Checksummed `0x` form of an address
pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}
