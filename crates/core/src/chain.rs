//! RPC collaborator seam
//!
//! Everything the core needs from a Solana node. Implementations are expected
//! to translate node rejections into structured [`VolumeError`] variants
//! (`InsufficientLamports`, `Transport`, ...) rather than leaving prose for
//! callers to parse.
//!
//! [`VolumeError`]: crate::error::VolumeError

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

use crate::error::VolumeResult;

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Lamports held by `owner`
    async fn native_balance(&self, owner: &Pubkey) -> VolumeResult<u64>;

    /// Amount held by an SPL token account, `None` when the account does not exist
    async fn token_account_balance(&self, token_account: &Pubkey) -> VolumeResult<Option<u64>>;

    async fn account_exists(&self, address: &Pubkey) -> VolumeResult<bool>;

    async fn mint_decimals(&self, mint: &Pubkey) -> VolumeResult<u8>;

    async fn latest_blockhash(&self) -> VolumeResult<Hash>;

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> VolumeResult<Signature>;

    async fn confirm_transaction(&self, signature: &Signature) -> VolumeResult<()>;

    /// Send, then wait for confirmation
    async fn submit(&self, transaction: &VersionedTransaction) -> VolumeResult<Signature> {
        let signature = self.send_transaction(transaction).await?;
        self.confirm_transaction(&signature).await?;
        Ok(signature)
    }
}
