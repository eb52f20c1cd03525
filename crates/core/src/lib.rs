//! Solana Volume Core Library
//!
//! This crate provides the amount codec, wallet vault, collaborator traits,
//! asset sweep, resilient executor and the trading state machine for the
//! rotating-wallet volume bot.

pub mod amount;
pub mod balance;
pub mod batch;
pub mod chain;
pub mod config;
pub mod error;
pub mod pricing;
pub mod retry;
pub mod swap;
pub mod sweep;
pub mod trader;
pub mod types;
pub mod vault;
pub mod withdraw;

#[cfg(test)]
mod testing;

pub use error::*;
pub use types::*;
