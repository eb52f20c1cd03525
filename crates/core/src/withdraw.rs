//! Sweep-All
//!
//! Best-effort withdrawal of every vaulted wallet back to the root wallet.
//! The root pays the fees, so each disposable wallet can be drained to zero.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use std::sync::Arc;
use tracing::{info, warn};

use crate::amount::format_sol;
use crate::balance::BalanceOracle;
use crate::batch::settle_all;
use crate::chain::ChainClient;
use crate::error::{VolumeError, VolumeResult};
use crate::sweep::{compile_signed, token_transfer_instruction};
use crate::types::Balances;
use crate::vault::WalletRecord;

#[derive(Debug, Clone)]
pub struct Withdrawn {
    pub address: Pubkey,
    pub balances: Balances,
    pub signature: Signature,
}

#[derive(Debug)]
pub struct WithdrawFailure {
    pub address: String,
    pub error: VolumeError,
}

#[derive(Debug, Default)]
pub struct WithdrawReport {
    pub withdrawn: Vec<Withdrawn>,
    /// Wallets holding neither SOL nor tokens
    pub empty: Vec<Pubkey>,
    pub failed: Vec<WithdrawFailure>,
}

impl WithdrawReport {
    pub fn total_native(&self) -> u64 {
        self.withdrawn.iter().map(|w| w.balances.native).sum()
    }

    pub fn total_token(&self) -> u64 {
        self.withdrawn.iter().map(|w| w.balances.token).sum()
    }
}

pub struct Withdrawal {
    chain: Arc<dyn ChainClient>,
    balances: BalanceOracle,
    mint: Pubkey,
}

impl Withdrawal {
    pub fn new(chain: Arc<dyn ChainClient>, mint: Pubkey) -> Self {
        Self {
            balances: BalanceOracle::new(chain.clone(), mint),
            chain,
            mint,
        }
    }

    /// Drain every record into `root`. Never fails as a whole; per-wallet
    /// errors land in the report.
    pub async fn withdraw_all(&self, root: &Keypair, records: &[WalletRecord]) -> WithdrawReport {
        let mut report = WithdrawReport::default();
        let mut wallets = Vec::with_capacity(records.len());

        for record in records {
            match record.keypair() {
                Ok(keypair) => wallets.push(keypair),
                Err(error) => {
                    warn!(address = %record.address, error = %error, "Skipping unreadable wallet");
                    report.failed.push(WithdrawFailure {
                        address: record.address.clone(),
                        error,
                    });
                }
            }
        }

        let settled = settle_all(wallets.iter().map(|keypair| async move {
            let address = keypair.pubkey();
            match self.balances.balance_of(&address).await {
                Ok(balances) => Ok((keypair, balances)),
                Err(error) => Err(WithdrawFailure {
                    address: address.to_string(),
                    error,
                }),
            }
        }))
        .await;

        for failure in settled.failures {
            warn!(address = %failure.address, error = %failure.error, "Balance check failed");
            report.failed.push(failure);
        }

        for (keypair, balances) in settled.successes {
            let address = keypair.pubkey();
            if balances.is_empty() {
                report.empty.push(address);
                continue;
            }

            match self.withdraw_one(root, keypair, balances).await {
                Ok(signature) => {
                    info!(
                        "✅ Withdrew {} SOL and {} token units from {}, tx: https://solscan.io/tx/{}",
                        format_sol(balances.native),
                        balances.token,
                        address,
                        signature
                    );
                    report.withdrawn.push(Withdrawn {
                        address,
                        balances,
                        signature,
                    });
                }
                Err(error) => {
                    warn!(address = %address, error = %error, "❌ Withdraw failed");
                    report.failed.push(WithdrawFailure {
                        address: address.to_string(),
                        error,
                    });
                }
            }
        }

        report
    }

    async fn withdraw_one(
        &self,
        root: &Keypair,
        wallet: &Keypair,
        balances: Balances,
    ) -> VolumeResult<Signature> {
        let mut instructions = Vec::with_capacity(2);
        if balances.token > 0 {
            instructions.push(token_transfer_instruction(
                &self.mint,
                &wallet.pubkey(),
                &root.pubkey(),
                balances.token,
            )?);
        }
        if balances.native > 0 {
            instructions.push(system_instruction::transfer(
                &wallet.pubkey(),
                &root.pubkey(),
                balances.native,
            ));
        }

        let blockhash = self.chain.latest_blockhash().await?;
        let transaction =
            compile_signed(&root.pubkey(), &instructions, blockhash, &[wallet, root])?;
        self.chain.submit(&transaction).await
    }
}
