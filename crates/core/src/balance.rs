//! Balance Oracle

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;

use crate::chain::ChainClient;
use crate::error::VolumeResult;
use crate::types::Balances;

/// Reads SOL and token balances for any owner, for one configured mint
#[derive(Clone)]
pub struct BalanceOracle {
    chain: Arc<dyn ChainClient>,
    mint: Pubkey,
}

impl BalanceOracle {
    pub fn new(chain: Arc<dyn ChainClient>, mint: Pubkey) -> Self {
        Self { chain, mint }
    }

    pub fn mint(&self) -> Pubkey {
        self.mint
    }

    /// A missing associated token account reads as zero tokens
    pub async fn balance_of(&self, owner: &Pubkey) -> VolumeResult<Balances> {
        let native = self.chain.native_balance(owner).await?;
        let token_account = get_associated_token_address(owner, &self.mint);
        let token = self
            .chain
            .token_account_balance(&token_account)
            .await?
            .unwrap_or(0);

        Ok(Balances { native, token })
    }
}
