//! Sweep-All
//!
//! Drains every wallet in the encrypted ledger back to the withdraw account
//! (`WITHDRAW_ACCOUNT`, falling back to `PRIVATE_KEY`).
//!
//! Ledger lines are base64 AES-256-GCM records with a per-record nonce.
//! Hex AES-256-CBC ledgers written by older fixed-IV tooling cannot be read
//! by this binary.

use anyhow::{Context, Result};
use solana_sdk::signature::Signer;
use std::sync::Arc;
use tracing::{info, warn};

use solana_volume_bot::rpc::SolanaRpc;
use solana_volume_bot::{logging, wallet};
use solana_volume_core::{
    amount::format_sol,
    chain::ChainClient,
    config::Config,
    sweep::AssetSweep,
    vault::{Cipher, WalletVault},
    withdraw::Withdrawal,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::setup();

    let config = Config::load().context("Failed to load configuration")?;
    let root = wallet::withdraw_keypair()?;
    let vault = WalletVault::new(
        &config.ledger_path,
        Cipher::from_secret(&wallet::hash_secret()?)?,
    );

    let records = vault
        .load_all()
        .with_context(|| format!("Failed to read {}", vault.path().display()))?;
    info!(
        "🏦 Withdrawing {} wallets from {} to {}",
        records.len(),
        vault.path().display(),
        root.pubkey()
    );

    let chain: Arc<dyn ChainClient> = Arc::new(SolanaRpc::new(&config.rpc_url, &config.commitment));
    let mint = config.token_mint()?;

    AssetSweep::new(chain.clone(), mint)
        .provision_token_account(&root, &root.pubkey())
        .await
        .context("Failed to create the withdraw token account")?;

    let report = Withdrawal::new(chain, mint)
        .withdraw_all(&root, &records)
        .await;

    info!(
        "✅ Withdrew {} SOL and {} token units from {} wallets ({} empty)",
        format_sol(report.total_native()),
        report.total_token(),
        report.withdrawn.len(),
        report.empty.len()
    );
    for failure in &report.failed {
        warn!("❌ {}: {}", failure.address, failure.error);
    }

    Ok(())
}
