//! Solana Volume Bot
//!
//! Production collaborators for the volume core: the Solana RPC client, the
//! Raydium swap and price clients, key loading and logging setup.

pub mod logging;
pub mod raydium;
pub mod rpc;
pub mod wallet;
