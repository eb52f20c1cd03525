//! Swap execution
//!
//! The swap collaborator quotes a route and returns unsigned transactions;
//! this module signs them with the trading wallet and submits them in order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chain::ChainClient;
use crate::error::{VolumeError, VolumeResult};
use crate::types::{Side, TokenMint, NATIVE_MINT};

/// Exact-in swap request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    /// Input amount in base units
    pub amount_in: u64,
    pub slippage_bps: u16,
}

impl SwapOrder {
    pub fn for_side(side: Side, token: &TokenMint, amount_in: u64, slippage_bps: u16) -> Self {
        let (input_mint, output_mint) = match side {
            Side::Buy => (NATIVE_MINT, token.address),
            Side::Sell => (token.address, NATIVE_MINT),
        };
        Self {
            input_mint,
            output_mint,
            amount_in,
            slippage_bps,
        }
    }

    pub fn is_input_native(&self) -> bool {
        self.input_mint == NATIVE_MINT
    }

    pub fn is_output_native(&self) -> bool {
        self.output_mint == NATIVE_MINT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub input_amount: u64,
    pub output_amount: u64,
    pub price_impact_pct: Option<f64>,
}

/// A quote plus the unsigned transactions that realise it
#[derive(Debug, Clone)]
pub struct PreparedSwap {
    pub quote: SwapQuote,
    pub transactions: Vec<VersionedTransaction>,
}

#[derive(Debug, Clone)]
pub struct SwapReceipt {
    pub quote: SwapQuote,
    pub signatures: Vec<Signature>,
}

impl SwapReceipt {
    pub fn output_amount(&self) -> u64 {
        self.quote.output_amount
    }
}

/// Swap quote-and-build collaborator
#[async_trait]
pub trait SwapProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quote `order` for `owner` and build the transactions to sign.
    ///
    /// Refusals worth retrying come back as [`VolumeError::SwapRejected`],
    /// requests the provider can never serve as [`VolumeError::SwapInvalid`].
    async fn prepare(&self, owner: &Pubkey, order: &SwapOrder) -> VolumeResult<PreparedSwap>;
}

#[derive(Clone)]
pub struct Swapper {
    chain: Arc<dyn ChainClient>,
    provider: Arc<dyn SwapProvider>,
}

impl Swapper {
    pub fn new(chain: Arc<dyn ChainClient>, provider: Arc<dyn SwapProvider>) -> Self {
        Self { chain, provider }
    }

    pub async fn execute(&self, owner: &Keypair, order: &SwapOrder) -> VolumeResult<SwapReceipt> {
        let prepared = self.provider.prepare(&owner.pubkey(), order).await?;

        if prepared.transactions.is_empty() {
            return Err(VolumeError::SwapInvalid(format!(
                "{} returned no transactions",
                self.provider.name()
            )));
        }

        let total = prepared.transactions.len();
        let mut signatures = Vec::with_capacity(total);

        for (idx, unsigned) in prepared.transactions.into_iter().enumerate() {
            let signed = VersionedTransaction::try_new(unsigned.message, &[owner])
                .map_err(|e| VolumeError::Transaction(format!("cannot sign swap: {}", e)))?;

            debug!("Submitting swap transaction {}/{}", idx + 1, total);
            let signature = self.chain.submit(&signed).await?;
            info!("✅ Confirmed transaction, tx: https://solscan.io/tx/{}", signature);
            signatures.push(signature);
        }

        Ok(SwapReceipt {
            quote: prepared.quote,
            signatures,
        })
    }
}
