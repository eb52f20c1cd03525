//! In-memory collaborators for unit and scenario tests
//!
//! `MockChain` keeps lamport and token-account balances and applies the
//! instructions it understands (system transfer, SPL transfer, associated
//! token account creation, and the mock swap below) atomically per
//! transaction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_instruction::SystemInstruction;
use solana_sdk::system_program;
use solana_sdk::transaction::VersionedTransaction;
use spl_associated_token_account::get_associated_token_address;
use spl_token::instruction::TokenInstruction;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::chain::ChainClient;
use crate::error::{VolumeError, VolumeResult};
use crate::pricing::{PriceMap, PriceOracle};
use crate::swap::{PreparedSwap, SwapOrder, SwapProvider, SwapQuote};
use crate::types::NATIVE_MINT;

pub fn mock_swap_program() -> Pubkey {
    Pubkey::new_from_array([7u8; 32])
}

/// Payload of the mock swap instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapLeg {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub amount_out: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentInstruction {
    System {
        from: Pubkey,
        to: Pubkey,
        lamports: u64,
    },
    Token {
        source: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
    },
    CreateTokenAccount {
        payer: Pubkey,
        account: Pubkey,
    },
    Swap {
        owner: Pubkey,
        leg: SwapLeg,
    },
    Other(Pubkey),
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    native: HashMap<Pubkey, u64>,
    /// Token account address -> amount; presence means the account exists
    tokens: HashMap<Pubkey, u64>,
}

impl Ledger {
    fn debit_native(&mut self, owner: &Pubkey, lamports: u64) -> VolumeResult<()> {
        let balance = self.native.entry(*owner).or_insert(0);
        if *balance < lamports {
            return Err(VolumeError::InsufficientLamports {
                available: *balance,
                needed: lamports,
            });
        }
        *balance -= lamports;
        Ok(())
    }

    fn debit_tokens(&mut self, account: &Pubkey, amount: u64) -> VolumeResult<()> {
        let balance = self
            .tokens
            .get_mut(account)
            .ok_or_else(|| VolumeError::Rpc(format!("token account {} not found", account)))?;
        if *balance < amount {
            return Err(VolumeError::InsufficientTokens(format!(
                "{} holds {}, need {}",
                account, balance, amount
            )));
        }
        *balance -= amount;
        Ok(())
    }

    fn apply(&mut self, instruction: &SentInstruction) -> VolumeResult<()> {
        match instruction {
            SentInstruction::System { from, to, lamports } => {
                self.debit_native(from, *lamports)?;
                *self.native.entry(*to).or_insert(0) += lamports;
            }
            SentInstruction::Token {
                source,
                destination,
                amount,
                ..
            } => {
                if !self.tokens.contains_key(destination) {
                    return Err(VolumeError::Rpc(format!(
                        "token account {} not found",
                        destination
                    )));
                }
                self.debit_tokens(source, *amount)?;
                *self.tokens.entry(*destination).or_insert(0) += amount;
            }
            SentInstruction::CreateTokenAccount { account, .. } => {
                if self.tokens.contains_key(account) {
                    return Err(VolumeError::Rpc(format!("account {} already in use", account)));
                }
                self.tokens.insert(*account, 0);
            }
            SentInstruction::Swap { owner, leg } => {
                if leg.input_mint == NATIVE_MINT {
                    self.debit_native(owner, leg.amount_in)?;
                } else {
                    self.debit_tokens(
                        &get_associated_token_address(owner, &leg.input_mint),
                        leg.amount_in,
                    )?;
                }
                if leg.output_mint == NATIVE_MINT {
                    *self.native.entry(*owner).or_insert(0) += leg.amount_out;
                } else {
                    *self
                        .tokens
                        .entry(get_associated_token_address(owner, &leg.output_mint))
                        .or_insert(0) += leg.amount_out;
                }
            }
            SentInstruction::Other(program) => {
                return Err(VolumeError::Rpc(format!("unknown program {}", program)));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct ChainState {
    ledger: Ledger,
    decimals: HashMap<Pubkey, u8>,
    send_failures: VecDeque<VolumeError>,
    balance_failures: VecDeque<VolumeError>,
    confirm_failures: VecDeque<VolumeError>,
    rejected_signers: HashSet<Pubkey>,
    attempts: Vec<VersionedTransaction>,
    landed: Vec<VersionedTransaction>,
}

#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_native(&self, owner: &Pubkey, lamports: u64) {
        self.state.lock().unwrap().ledger.native.insert(*owner, lamports);
    }

    /// Set the owner's associated token account balance, creating the account
    pub fn set_tokens(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) {
        self.state
            .lock()
            .unwrap()
            .ledger
            .tokens
            .insert(get_associated_token_address(owner, mint), amount);
    }

    pub fn set_decimals(&self, mint: &Pubkey, decimals: u8) {
        self.state.lock().unwrap().decimals.insert(*mint, decimals);
    }

    pub fn native_of(&self, owner: &Pubkey) -> u64 {
        self.state
            .lock()
            .unwrap()
            .ledger
            .native
            .get(owner)
            .copied()
            .unwrap_or(0)
    }

    pub fn tokens_of(&self, owner: &Pubkey, mint: &Pubkey) -> u64 {
        self.state
            .lock()
            .unwrap()
            .ledger
            .tokens
            .get(&get_associated_token_address(owner, mint))
            .copied()
            .unwrap_or(0)
    }

    /// Fail the next submission with `error` before it touches any balance
    pub fn fail_next_send(&self, error: VolumeError) {
        self.state.lock().unwrap().send_failures.push_back(error);
    }

    pub fn fail_next_balance(&self, error: VolumeError) {
        self.state.lock().unwrap().balance_failures.push_back(error);
    }

    /// Fail the next confirmation after the transaction has already landed
    pub fn fail_next_confirm(&self, error: VolumeError) {
        self.state.lock().unwrap().confirm_failures.push_back(error);
    }

    /// Reject every transaction this key has to sign
    pub fn reject_signer(&self, signer: &Pubkey) {
        self.state.lock().unwrap().rejected_signers.insert(*signer);
    }

    /// Every submitted transaction, including failed ones
    pub fn attempts(&self) -> Vec<VersionedTransaction> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// Transactions that were applied
    pub fn landed(&self) -> Vec<VersionedTransaction> {
        self.state.lock().unwrap().landed.clone()
    }

    pub fn decode(transaction: &VersionedTransaction) -> Vec<SentInstruction> {
        let keys = transaction.message.static_account_keys();
        let key = |index: &u8| keys[*index as usize];

        transaction
            .message
            .instructions()
            .iter()
            .map(|ix| {
                let program = keys[ix.program_id_index as usize];
                let accounts: Vec<Pubkey> = ix.accounts.iter().map(key).collect();

                if program == system_program::id() {
                    if let Ok(SystemInstruction::Transfer { lamports }) =
                        bincode::deserialize::<SystemInstruction>(&ix.data)
                    {
                        return SentInstruction::System {
                            from: accounts[0],
                            to: accounts[1],
                            lamports,
                        };
                    }
                } else if program == spl_token::id() {
                    if let Ok(TokenInstruction::Transfer { amount }) =
                        TokenInstruction::unpack(&ix.data)
                    {
                        return SentInstruction::Token {
                            source: accounts[0],
                            destination: accounts[1],
                            authority: accounts[2],
                            amount,
                        };
                    }
                } else if program == spl_associated_token_account::id() {
                    return SentInstruction::CreateTokenAccount {
                        payer: accounts[0],
                        account: accounts[1],
                    };
                } else if program == mock_swap_program() {
                    if let Ok(leg) = bincode::deserialize::<SwapLeg>(&ix.data) {
                        return SentInstruction::Swap {
                            owner: accounts[0],
                            leg,
                        };
                    }
                }
                SentInstruction::Other(program)
            })
            .collect()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn native_balance(&self, owner: &Pubkey) -> VolumeResult<u64> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.balance_failures.pop_front() {
            return Err(error);
        }
        Ok(state.ledger.native.get(owner).copied().unwrap_or(0))
    }

    async fn token_account_balance(&self, token_account: &Pubkey) -> VolumeResult<Option<u64>> {
        Ok(self.state.lock().unwrap().ledger.tokens.get(token_account).copied())
    }

    async fn account_exists(&self, address: &Pubkey) -> VolumeResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.ledger.tokens.contains_key(address) || state.ledger.native.contains_key(address))
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> VolumeResult<u8> {
        self.state
            .lock()
            .unwrap()
            .decimals
            .get(mint)
            .copied()
            .ok_or_else(|| VolumeError::Rpc(format!("mint {} not found", mint)))
    }

    async fn latest_blockhash(&self) -> VolumeResult<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> VolumeResult<Signature> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(transaction.clone());

        if let Some(error) = state.send_failures.pop_front() {
            return Err(error);
        }

        if !transaction.verify_with_results().iter().all(|ok| *ok) {
            return Err(VolumeError::Transaction("signature verification failed".into()));
        }

        let signers = usize::from(transaction.message.header().num_required_signatures);
        let keys = transaction.message.static_account_keys();
        if let Some(rejected) = keys[..signers]
            .iter()
            .find(|key| state.rejected_signers.contains(key))
        {
            return Err(VolumeError::Rpc(format!("account {} is blocked", rejected)));
        }

        let mut ledger = state.ledger.clone();
        for instruction in Self::decode(transaction) {
            ledger.apply(&instruction)?;
        }
        state.ledger = ledger;
        state.landed.push(transaction.clone());

        Ok(transaction.signatures[0])
    }

    async fn confirm_transaction(&self, _signature: &Signature) -> VolumeResult<()> {
        match self.state.lock().unwrap().confirm_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Swap provider that trades 1:1 through [`mock_swap_program`]
#[derive(Default)]
pub struct MockSwap {
    rejections: Mutex<VecDeque<VolumeError>>,
    orders: Mutex<Vec<SwapOrder>>,
}

impl MockSwap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_next(&self, error: VolumeError) {
        self.rejections.lock().unwrap().push_back(error);
    }

    /// Every order that reached the provider, rejected or not
    pub fn orders(&self) -> Vec<SwapOrder> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapProvider for MockSwap {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn prepare(&self, owner: &Pubkey, order: &SwapOrder) -> VolumeResult<PreparedSwap> {
        self.orders.lock().unwrap().push(order.clone());
        if let Some(error) = self.rejections.lock().unwrap().pop_front() {
            return Err(error);
        }

        let leg = SwapLeg {
            input_mint: order.input_mint,
            output_mint: order.output_mint,
            amount_in: order.amount_in,
            amount_out: order.amount_in,
        };
        let instruction = Instruction::new_with_bincode(
            mock_swap_program(),
            &leg,
            vec![AccountMeta::new(*owner, true)],
        );
        let message = v0::Message::try_compile(owner, &[instruction], &[], Hash::default())
            .map_err(|e| VolumeError::Transaction(e.to_string()))?;

        Ok(PreparedSwap {
            quote: SwapQuote {
                input_amount: leg.amount_in,
                output_amount: leg.amount_out,
                price_impact_pct: None,
            },
            transactions: vec![VersionedTransaction {
                signatures: vec![Signature::default()],
                message: VersionedMessage::V0(message),
            }],
        })
    }
}

pub struct MockPrices(pub PriceMap);

#[async_trait]
impl PriceOracle for MockPrices {
    async fn prices(&self, mints: &[Pubkey]) -> VolumeResult<PriceMap> {
        Ok(mints
            .iter()
            .filter_map(|mint| self.0.get(mint).map(|price| (*mint, *price)))
            .collect())
    }
}
