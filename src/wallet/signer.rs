//! Signing identity derived from the configured private key

use ethers::signers::{LocalWallet, Signer};
use tracing::debug;

use crate::error::{Error, Result};

/// Build the funding wallet from a hex private key (`0x` prefix optional)
///
/// The key itself never appears in the error message.
pub fn load_signer(credential: &str) -> Result<LocalWallet> {
    let wallet: LocalWallet = credential
        .trim()
        .parse()
        .map_err(|e: ethers::signers::WalletError| Error::InvalidKey(e.to_string()))?;

    debug!("Loaded signer: {:?}", wallet.address());
    Ok(wallet)
}
