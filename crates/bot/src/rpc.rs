//! Solana RPC collaborator
//!
//! Wraps the non-blocking RPC client and turns node failures into the
//! structured error taxonomy the retry driver classifies.

use async_trait::async_trait;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::client_error::{Error as ClientError, ErrorKind as ClientErrorKind};
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_rpc_client_api::request::{RpcError, RpcResponseErrorData};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use spl_token::state::{Account as TokenAccount, Mint};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use solana_volume_core::chain::ChainClient;
use solana_volume_core::{VolumeError, VolumeResult};

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(90);

pub fn parse_commitment(value: &str) -> CommitmentConfig {
    match value {
        "processed" => CommitmentConfig::processed(),
        "finalized" => CommitmentConfig::finalized(),
        _ => CommitmentConfig::confirmed(),
    }
}

fn map_transaction_error(err: &TransactionError) -> VolumeError {
    match err {
        TransactionError::InsufficientFundsForFee
        | TransactionError::InsufficientFundsForRent { .. } => {
            VolumeError::InsufficientFunds(err.to_string())
        }
        other => VolumeError::Transaction(other.to_string()),
    }
}

/// Structural mapping first; simulation log text only as a fallback
pub fn map_client_error(err: ClientError) -> VolumeError {
    match err.kind() {
        ClientErrorKind::Io(e) => VolumeError::Transport(e.to_string()),
        ClientErrorKind::Reqwest(e) => VolumeError::Transport(e.to_string()),
        ClientErrorKind::TransactionError(tx_err) => map_transaction_error(tx_err),
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(sim),
            message,
            ..
        }) => {
            if let Some(
                tx_err @ (TransactionError::InsufficientFundsForFee
                | TransactionError::InsufficientFundsForRent { .. }),
            ) = &sim.err
            {
                return map_transaction_error(tx_err);
            }

            let logs = sim.logs.as_deref().unwrap_or_default().join("\n");
            match VolumeError::from_rejection_text(&logs) {
                VolumeError::Rpc(_) => VolumeError::Rpc(message.clone()),
                classified => classified,
            }
        }
        _ => VolumeError::Rpc(err.to_string()),
    }
}

pub struct SolanaRpc {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaRpc {
    pub fn new(url: &str, commitment: &str) -> Self {
        let commitment = parse_commitment(commitment);
        Self {
            client: RpcClient::new_with_commitment(url.to_string(), commitment),
            commitment,
        }
    }

    async fn account_data(&self, address: &Pubkey) -> VolumeResult<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(map_client_error)?;
        Ok(response.value.map(|account| account.data))
    }
}

#[async_trait]
impl ChainClient for SolanaRpc {
    async fn native_balance(&self, owner: &Pubkey) -> VolumeResult<u64> {
        let response = self
            .client
            .get_balance_with_commitment(owner, self.commitment)
            .await
            .map_err(map_client_error)?;
        Ok(response.value)
    }

    async fn token_account_balance(&self, token_account: &Pubkey) -> VolumeResult<Option<u64>> {
        let Some(data) = self.account_data(token_account).await? else {
            return Ok(None);
        };
        let account = data
            .get(..TokenAccount::LEN)
            .and_then(|bytes| TokenAccount::unpack_from_slice(bytes).ok())
            .ok_or_else(|| {
                VolumeError::Rpc(format!("{} is not a token account", token_account))
            })?;
        Ok(Some(account.amount))
    }

    async fn account_exists(&self, address: &Pubkey) -> VolumeResult<bool> {
        Ok(self.account_data(address).await?.is_some())
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> VolumeResult<u8> {
        let data = self
            .account_data(mint)
            .await?
            .ok_or_else(|| VolumeError::Config(format!("mint {} does not exist", mint)))?;
        let mint_state = data
            .get(..Mint::LEN)
            .and_then(|bytes| Mint::unpack_from_slice(bytes).ok())
            .ok_or_else(|| VolumeError::Config(format!("{} is not an SPL mint", mint)))?;
        Ok(mint_state.decimals)
    }

    async fn latest_blockhash(&self) -> VolumeResult<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(map_client_error)
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> VolumeResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            ..Default::default()
        };

        let signature = self
            .client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(map_client_error)?;
        debug!("📡 Transaction sent: {}. Waiting for confirmation...", signature);
        Ok(signature)
    }

    async fn confirm_transaction(&self, signature: &Signature) -> VolumeResult<()> {
        let started = Instant::now();

        loop {
            let status = self
                .client
                .get_signature_status_with_commitment(signature, self.commitment)
                .await
                .map_err(map_client_error)?;

            match status {
                Some(Ok(())) => return Ok(()),
                Some(Err(err)) => return Err(map_transaction_error(&err)),
                None if started.elapsed() >= CONFIRM_TIMEOUT => {
                    return Err(VolumeError::Rpc(format!(
                        "transaction {} not confirmed after {}s",
                        signature,
                        CONFIRM_TIMEOUT.as_secs()
                    )))
                }
                None => sleep(CONFIRM_POLL_INTERVAL).await,
            }
        }
    }
}
