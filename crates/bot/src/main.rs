//! Solana Volume Trading Bot
//!
//! Trades the configured token from a chain of disposable wallets, rotating
//! to a fresh wallet whenever the buy and sell quotas are both met.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use solana_volume_bot::raydium::{RaydiumPrice, RaydiumSwap};
use solana_volume_bot::rpc::SolanaRpc;
use solana_volume_bot::{logging, wallet};
use solana_volume_core::{
    amount::format_sol,
    chain::ChainClient,
    config::Config,
    retry::{RestartPolicy, RetryPolicy},
    trader::{Collaborators, TradeSettings, Trader},
    vault::{Cipher, Wallet, WalletVault},
    TokenMint,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::setup();

    if let Err(e) = run().await {
        error!("💥 Volume bot stopped: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let settings = TradeSettings::from_config(&config)?;

    info!("🚀 Solana Volume Bot starting...");
    info!("   RPC URL: {}", config.rpc_url);
    info!("   Token: {}", config.token_address);
    info!("   Slippage: {}% ({} bps)", config.slippage, settings.slippage_bps);
    info!(
        "   Quota: {} buys / {} sells, starting with {}",
        settings.quota.buys, settings.quota.sells, settings.start_side
    );
    info!(
        "   Order size: {} - {} SOL, wait {} - {}s",
        config.min_sol, config.max_sol, config.wait_time_min, config.wait_time_max
    );

    let root = Wallet::from_keypair(wallet::root_keypair()?);
    let cipher = Cipher::from_secret(&wallet::hash_secret()?)?;
    let vault = WalletVault::new(&config.ledger_path, cipher);

    let chain: Arc<dyn ChainClient> = Arc::new(SolanaRpc::new(&config.rpc_url, &config.commitment));
    let mint = config.token_mint()?;
    let token = TokenMint::new(mint, chain.mint_decimals(&mint).await?);

    let root_balance = chain.native_balance(&root.pubkey()).await?;
    info!(
        "💰 Root wallet {} holds {} SOL (token decimals: {})",
        root.pubkey(),
        format_sol(root_balance),
        token.decimals
    );

    let collaborators = Collaborators {
        chain: chain.clone(),
        swaps: Arc::new(RaydiumSwap::new(chain.clone())?),
        prices: Arc::new(RaydiumPrice::new()?),
    };

    let mut trader = Trader::new(settings, token, vault, collaborators)
        .with_retry(RetryPolicy::new(config.retry_delay()));
    let mut restarts = RestartPolicy::new(config.restart_limit, config.restart_pause());
    let mut state = trader.start(root);

    loop {
        let halted = trader.run(state).await;
        if !restarts.allow(&halted.error).await {
            return Err(halted.error.into());
        }

        warn!(
            "Resuming on {} ({} restarts left)",
            halted.state.account.pubkey(),
            restarts.remaining()
        );
        state = halted.state;
    }
}
