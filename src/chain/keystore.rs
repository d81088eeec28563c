//! Keystore loading
//!
//! Decrypts the wallet's JSON keystore and checks that the key belongs to
//! the configured wallet address.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{anyhow, bail, Result};
use std::path::Path;
use tracing::info;

pub fn load_signer(
    keystore_path: &Path,
    secret: &str,
    expected: Address,
) -> Result<PrivateKeySigner> {
    if !keystore_path.is_file() {
        bail!("Wallet keystore not found: {}", keystore_path.display());
    }

    let signer = PrivateKeySigner::decrypt_keystore(keystore_path, secret).map_err(|e| {
        anyhow!(
            "Failed to decrypt keystore {}: {}",
            keystore_path.display(),
            e
        )
    })?;

    if signer.address() != expected {
        bail!(
            "Keystore key belongs to {} but WALLET_ADDRESS is {}",
            signer.address(),
            expected
        );
    }

    info!("Wallet loaded: {}", signer.address());
    Ok(signer)
}
