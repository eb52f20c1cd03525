//! Key Loading
//!
//! Reads signing keys from the environment. A key may be given either as a
//! JSON byte array (the `solana-keygen` file format) or as base58.

use anyhow::{anyhow, Context, Result};
use solana_sdk::signature::{Keypair, Signer};
use std::env;
use tracing::info;

pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";
pub const WITHDRAW_ACCOUNT_VAR: &str = "WITHDRAW_ACCOUNT";
pub const HASH_SECRET_VAR: &str = "HASH_SECRET";

/// Load the keypair stored in `var`
pub fn load_keypair(var: &str) -> Result<Keypair> {
    let value = env::var(var).with_context(|| format!("{} is not set", var))?;
    let keypair = parse_keypair(value.trim()).with_context(|| format!("{} is invalid", var))?;
    info!("Wallet loaded from {}: {}", var, keypair.pubkey());
    Ok(keypair)
}

/// Root wallet used for trading
pub fn root_keypair() -> Result<Keypair> {
    load_keypair(PRIVATE_KEY_VAR)
}

/// Withdraw target, falling back to the trading root
pub fn withdraw_keypair() -> Result<Keypair> {
    match env::var(WITHDRAW_ACCOUNT_VAR) {
        Ok(value) if !value.trim().is_empty() => load_keypair(WITHDRAW_ACCOUNT_VAR),
        _ => root_keypair(),
    }
}

pub fn hash_secret() -> Result<String> {
    env::var(HASH_SECRET_VAR).with_context(|| format!("{} is not set", HASH_SECRET_VAR))
}

pub fn parse_keypair(value: &str) -> Result<Keypair> {
    if value.is_empty() {
        return Err(anyhow!("empty key"));
    }

    if value.starts_with('[') {
        let bytes: Vec<u8> = serde_json::from_str(value)?;
        return Keypair::from_bytes(&bytes).map_err(|e| anyhow!("Invalid keypair bytes: {}", e));
    }

    let decoded = bs58::decode(value).into_vec()?;
    Keypair::from_bytes(&decoded).map_err(|e| anyhow!("Invalid base58 keypair: {}", e))
}
