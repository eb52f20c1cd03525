//! Core types for the volume trading system

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Wrapped SOL mint, used as the native side of every swap
pub const NATIVE_MINT: Pubkey = spl_token::native_mint::ID;

/// Trade direction relative to the configured token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// SOL -> token
    Buy,
    /// token -> SOL
    Sell,
}

impl Side {
    pub fn from_start_with_buy(start_with_buy: bool) -> Self {
        if start_with_buy {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The traded SPL token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMint {
    pub address: Pubkey,
    pub decimals: u8,
}

impl TokenMint {
    pub fn new(address: Pubkey, decimals: u8) -> Self {
        Self { address, decimals }
    }

    pub fn decimals(&self) -> u32 {
        u32::from(self.decimals)
    }
}

/// Balances of one wallet, in base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Lamports held by the wallet itself
    pub native: u64,
    /// Amount in the wallet's associated token account (0 if absent)
    pub token: u64,
}

impl Balances {
    pub fn new(native: u64, token: u64) -> Self {
        Self { native, token }
    }

    pub fn is_empty(&self) -> bool {
        self.native == 0 && self.token == 0
    }

    /// Balance of the asset spent when trading on `side`
    pub fn spendable(&self, side: Side) -> u64 {
        match side {
            Side::Buy => self.native,
            Side::Sell => self.token,
        }
    }
}

/// How the random order size is interpreted on the sell side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellSizing {
    /// The drawn quantity is a token amount
    #[default]
    TokenUnits,
    /// The drawn quantity is SOL, converted to tokens at current USD prices
    NativeEquivalent,
}
