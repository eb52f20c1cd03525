//! Writes the decrypted wallet ledger as pretty JSON.
//!
//! Ledger lines are base64 AES-256-GCM records with a per-record nonce.
//! Hex AES-256-CBC ledgers written by older fixed-IV tooling cannot be read
//! by this binary.

use anyhow::{Context, Result};
use tracing::info;

use solana_volume_bot::{logging, wallet};
use solana_volume_core::{
    config::Config,
    vault::{Cipher, WalletVault},
};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::setup();

    let config = Config::load().context("Failed to load configuration")?;
    let vault = WalletVault::new(
        &config.ledger_path,
        Cipher::from_secret(&wallet::hash_secret()?)?,
    );

    let count = vault
        .export_decoded(&config.decoded_path)
        .with_context(|| format!("Failed to decode {}", vault.path().display()))?;

    info!(
        "📝 Decoded {} wallets into {}",
        count,
        config.decoded_path.display()
    );
    Ok(())
}
