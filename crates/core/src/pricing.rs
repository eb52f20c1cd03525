//! Price collaborator seam

use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

use crate::error::{VolumeError, VolumeResult};

/// USD prices keyed by mint
pub type PriceMap = HashMap<Pubkey, Decimal>;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn prices(&self, mints: &[Pubkey]) -> VolumeResult<PriceMap>;
}

/// Look up a price that must be present and positive
pub fn require_price(prices: &PriceMap, mint: &Pubkey) -> VolumeResult<Decimal> {
    match prices.get(mint) {
        Some(price) if *price > Decimal::ZERO => Ok(*price),
        Some(price) => Err(VolumeError::PriceFetch(format!(
            "non-positive price {} for {}",
            price, mint
        ))),
        None => Err(VolumeError::PriceFetch(format!("no price for {}", mint))),
    }
}
