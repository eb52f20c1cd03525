//! Asset Sweep
//!
//! Moves SOL and tokens from one wallet to another in a single v0
//! transaction. When the node reports that the source cannot cover the
//! lamports plus fees, the shortfall is taken off the SOL leg and the
//! transfer is rebuilt for the same destination.

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::VersionedTransaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::amount::format_sol;
use crate::chain::ChainClient;
use crate::error::{VolumeError, VolumeResult};
use crate::vault::Wallet;

/// Compile a v0 message for `payer` and sign it with every signer
pub(crate) fn compile_signed(
    payer: &Pubkey,
    instructions: &[Instruction],
    blockhash: Hash,
    signers: &[&Keypair],
) -> VolumeResult<VersionedTransaction> {
    let message = v0::Message::try_compile(payer, instructions, &[], blockhash)
        .map_err(|e| VolumeError::Transaction(format!("cannot compile message: {}", e)))?;

    VersionedTransaction::try_new(VersionedMessage::V0(message), signers)
        .map_err(|e| VolumeError::Transaction(format!("cannot sign transaction: {}", e)))
}

/// SPL transfer between the associated token accounts of two owners
pub(crate) fn token_transfer_instruction(
    mint: &Pubkey,
    from_owner: &Pubkey,
    to_owner: &Pubkey,
    amount: u64,
) -> VolumeResult<Instruction> {
    spl_token::instruction::transfer(
        &spl_token::id(),
        &get_associated_token_address(from_owner, mint),
        &get_associated_token_address(to_owner, mint),
        from_owner,
        &[],
        amount,
    )
    .map_err(|e| VolumeError::Transaction(format!("cannot build token transfer: {}", e)))
}

#[derive(Clone)]
pub struct AssetSweep {
    chain: Arc<dyn ChainClient>,
    mint: Pubkey,
}

impl AssetSweep {
    pub fn new(chain: Arc<dyn ChainClient>, mint: Pubkey) -> Self {
        Self { chain, mint }
    }

    /// Transfer `native` lamports and `token` units from `source` to
    /// `destination`, shrinking the SOL leg until the fee fits.
    pub async fn transfer(
        &self,
        source: &Keypair,
        destination: &Pubkey,
        native: u64,
        token: u64,
    ) -> VolumeResult<Signature> {
        let dest_token_account = get_associated_token_address(destination, &self.mint);
        let needs_token_account = !self.chain.account_exists(&dest_token_account).await?;
        let mut native = native;

        loop {
            let mut instructions = Vec::with_capacity(3);
            if needs_token_account {
                instructions.push(create_associated_token_account(
                    &source.pubkey(),
                    destination,
                    &self.mint,
                    &spl_token::id(),
                ));
            }
            if token > 0 {
                instructions.push(token_transfer_instruction(
                    &self.mint,
                    &source.pubkey(),
                    destination,
                    token,
                )?);
            }
            if native > 0 {
                instructions.push(system_instruction::transfer(
                    &source.pubkey(),
                    destination,
                    native,
                ));
            }

            let blockhash = self.chain.latest_blockhash().await?;
            let transaction = compile_signed(&source.pubkey(), &instructions, blockhash, &[source])?;

            debug!(
                "Sweeping {} SOL and {} token units to {}",
                format_sol(native),
                token,
                destination
            );

            match self.chain.submit(&transaction).await {
                Ok(signature) => {
                    info!("✅ Transfer confirmed, tx: https://solscan.io/tx/{}", signature);
                    return Ok(signature);
                }
                Err(VolumeError::InsufficientLamports { available, needed })
                    if needed > available && needed - available < native =>
                {
                    let shortfall = needed - available;
                    warn!(
                        available,
                        needed,
                        "Short by {} lamports, retrying with {} SOL",
                        shortfall,
                        format_sol(native - shortfall)
                    );
                    native -= shortfall;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Transfer to `destination` and hand it back as the next active wallet
    pub async fn sweep(
        &self,
        source: &Wallet,
        destination: Wallet,
        native: u64,
        token: u64,
    ) -> VolumeResult<Wallet> {
        info!(
            "🔁 Rotating {} -> {} ({} SOL, {} token units)",
            source.pubkey(),
            destination.pubkey(),
            format_sol(native),
            token
        );

        self.transfer(source.keypair(), &destination.pubkey(), native, token)
            .await?;
        Ok(destination)
    }

    /// Make sure `owner` has an associated token account, paid for by `payer`
    pub async fn provision_token_account(
        &self,
        payer: &Keypair,
        owner: &Pubkey,
    ) -> VolumeResult<Pubkey> {
        let token_account = get_associated_token_address(owner, &self.mint);
        if self.chain.account_exists(&token_account).await? {
            return Ok(token_account);
        }

        let instruction =
            create_associated_token_account(&payer.pubkey(), owner, &self.mint, &spl_token::id());
        let blockhash = self.chain.latest_blockhash().await?;
        let transaction = compile_signed(&payer.pubkey(), &[instruction], blockhash, &[payer])?;
        let signature = self.chain.submit(&transaction).await?;

        info!(
            "Created token account {} for {}, tx: {}",
            token_account, owner, signature
        );
        Ok(token_account)
    }
}
