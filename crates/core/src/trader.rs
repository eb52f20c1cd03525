//! Trading State Machine
//!
//! A session trades one disposable wallet until both the buy and the sell
//! quota are met, then rotates: a fresh wallet is minted into the vault,
//! 99% of both balances are swept into it, and counting starts over.
//!
//! The session state is a plain value. `tick` takes the current state and
//! returns the next one, or a [`Halted`] carrying the state to resume from.
//! A rotation records its destination in that state before sweeping, so a
//! resumed rotation reuses the wallet instead of minting another.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::amount::{
    draw_between, format_sol, format_token, parse_sol, percent_of, to_base_units, to_ui_amount,
    SOL_DECIMALS,
};
use crate::balance::BalanceOracle;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::error::{VolumeError, VolumeResult};
use crate::pricing::{require_price, PriceOracle};
use crate::retry::RetryPolicy;
use crate::swap::{SwapOrder, SwapProvider, Swapper};
use crate::sweep::AssetSweep;
use crate::types::{Balances, SellSizing, Side, TokenMint, NATIVE_MINT};
use crate::vault::{Wallet, WalletVault};

/// Consecutive orders per side before the wallet rotates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub buys: u32,
    pub sells: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AccumulatingBuys,
    AccumulatingSells,
    Rotating,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub account: Wallet,
    pub buy_count: u32,
    pub sell_count: u32,
    pub side: Side,
    /// Wallet minted by an unfinished rotation
    pub pending_destination: Option<Wallet>,
}

impl SessionState {
    pub fn fresh(account: Wallet, side: Side) -> Self {
        Self {
            account,
            buy_count: 0,
            sell_count: 0,
            side,
            pending_destination: None,
        }
    }

    /// A met quota forces the opposite side; both met means rotate.
    pub fn next_phase(&self, quota: &Quota) -> Phase {
        let buys_done = self.buy_count >= quota.buys;
        let sells_done = self.sell_count >= quota.sells;

        match (buys_done, sells_done) {
            (true, true) => Phase::Rotating,
            (true, false) => Phase::AccumulatingSells,
            (false, true) => Phase::AccumulatingBuys,
            (false, false) => match self.side {
                Side::Buy => Phase::AccumulatingBuys,
                Side::Sell => Phase::AccumulatingSells,
            },
        }
    }

    pub fn after_trade(&self, side: Side) -> Self {
        let mut next = self.clone();
        match side {
            Side::Buy => next.buy_count += 1,
            Side::Sell => next.sell_count += 1,
        }
        next.side = side;
        next
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Traded {
        side: Side,
        amount_in: u64,
        amount_out: u64,
    },
    /// Balance too low for the drawn size; nothing was counted
    Insufficient {
        side: Side,
        needed: u64,
        available: u64,
    },
    Rotated {
        from: Pubkey,
        to: Pubkey,
    },
}

/// Trading parameters resolved to base units
#[derive(Debug, Clone)]
pub struct TradeSettings {
    pub quota: Quota,
    pub start_side: Side,
    pub slippage_bps: u16,
    /// Order size bounds, lamports
    pub min_order: u64,
    pub max_order: u64,
    /// Inter-order wait bounds, milliseconds
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    pub insufficient_wait: Duration,
    pub sweep_percent: u8,
    pub sell_sizing: SellSizing,
}

impl TradeSettings {
    pub fn from_config(config: &Config) -> VolumeResult<Self> {
        Ok(Self {
            quota: Quota {
                buys: config.consecutive_buys,
                sells: config.consecutive_sells,
            },
            start_side: config.start_side(),
            slippage_bps: config.slippage_bps()?,
            min_order: parse_sol(config.min_sol)?,
            max_order: parse_sol(config.max_sol)?,
            min_wait_ms: to_base_units(config.wait_time_min, 3)?,
            max_wait_ms: to_base_units(config.wait_time_max, 3)?,
            insufficient_wait: config.insufficient_wait(),
            sweep_percent: config.sweep_percent,
            sell_sizing: config.sell_sizing,
        })
    }
}

/// External services a trader talks to
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainClient>,
    pub swaps: Arc<dyn SwapProvider>,
    pub prices: Arc<dyn PriceOracle>,
}

/// Session ended by a non-retryable error; `state` is where to resume
#[derive(Debug)]
pub struct Halted {
    pub state: SessionState,
    pub error: VolumeError,
}

pub struct Trader {
    settings: TradeSettings,
    token: TokenMint,
    vault: WalletVault,
    balances: BalanceOracle,
    swapper: Swapper,
    sweep: AssetSweep,
    prices: Arc<dyn PriceOracle>,
    retry: RetryPolicy,
    rng: Box<dyn RngCore + Send>,
}

impl Trader {
    pub fn new(
        settings: TradeSettings,
        token: TokenMint,
        vault: WalletVault,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            chain,
            swaps,
            prices,
        } = collaborators;

        Self {
            settings,
            token,
            vault,
            balances: BalanceOracle::new(chain.clone(), token.address),
            swapper: Swapper::new(chain.clone(), swaps),
            sweep: AssetSweep::new(chain, token.address),
            prices,
            retry: RetryPolicy::default(),
            rng: Box::new(StdRng::from_entropy()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    pub fn settings(&self) -> &TradeSettings {
        &self.settings
    }

    /// Starting state for the given wallet
    pub fn start(&self, account: Wallet) -> SessionState {
        SessionState::fresh(account, self.settings.start_side)
    }

    /// Tick until a non-retryable failure, returning the state to resume from
    pub async fn run(&mut self, state: SessionState) -> Halted {
        let mut state = state;

        info!(
            "🚀 Trading session on {} ({} buys / {} sells per wallet)",
            state.account.pubkey(),
            self.settings.quota.buys,
            self.settings.quota.sells
        );

        loop {
            match self.tick(&state).await {
                Ok((next, outcome)) => {
                    debug!(?outcome, buys = next.buy_count, sells = next.sell_count, "Tick complete");
                    state = next;
                }
                Err(halted) => {
                    error!(
                        wallet = %halted.state.account.pubkey(),
                        kind = %halted.error.class(),
                        error = %halted.error,
                        "❌ Trading session halted"
                    );
                    return halted;
                }
            }
        }
    }

    pub async fn tick(
        &mut self,
        state: &SessionState,
    ) -> Result<(SessionState, TickOutcome), Halted> {
        let traded = match state.next_phase(&self.settings.quota) {
            Phase::Rotating => return self.rotate(state).await,
            Phase::AccumulatingBuys => self.trade(state, Side::Buy).await,
            Phase::AccumulatingSells => self.trade(state, Side::Sell).await,
        };
        traded.map_err(|error| Halted {
            state: state.clone(),
            error,
        })
    }

    async fn rotate(
        &mut self,
        state: &SessionState,
    ) -> Result<(SessionState, TickOutcome), Halted> {
        let resuming = state.pending_destination.is_some();
        let destination = match &state.pending_destination {
            Some(pending) => pending.clone(),
            None => self.vault.mint().map_err(|error| Halted {
                state: state.clone(),
                error,
            })?,
        };
        let resume = SessionState {
            pending_destination: Some(destination.clone()),
            ..state.clone()
        };

        let rotated = self.sweep_into(&resume, destination, resuming).await;
        rotated.map_err(|error| Halted {
            state: resume,
            error,
        })
    }

    async fn sweep_into(
        &mut self,
        state: &SessionState,
        destination: Wallet,
        resuming: bool,
    ) -> VolumeResult<(SessionState, TickOutcome)> {
        let current = &state.account;

        // Only our sweep funds a freshly minted wallet
        if resuming {
            let held = self.read_balances(&destination.pubkey()).await?;
            if !held.is_empty() {
                info!(
                    "🔁 Earlier sweep into {} landed, finishing rotation",
                    destination.pubkey()
                );
                return Ok(self.finish_rotation(current, destination));
            }
            warn!("Resuming rotation into {}", destination.pubkey());
        }

        let balances = self.read_balances(&current.pubkey()).await?;
        let native = percent_of(balances.native, self.settings.sweep_percent);
        let token = percent_of(balances.token, self.settings.sweep_percent);

        let sweep = &self.sweep;
        let next = self
            .retry
            .execute("sweep", move || sweep.sweep(current, destination.clone(), native, token))
            .await?;

        Ok(self.finish_rotation(current, next))
    }

    fn finish_rotation(&self, from: &Wallet, to: Wallet) -> (SessionState, TickOutcome) {
        let outcome = TickOutcome::Rotated {
            from: from.pubkey(),
            to: to.pubkey(),
        };
        (SessionState::fresh(to, self.settings.start_side), outcome)
    }

    async fn trade(
        &mut self,
        state: &SessionState,
        side: Side,
    ) -> VolumeResult<(SessionState, TickOutcome)> {
        let owner = state.account.pubkey();
        let balances = self.read_balances(&owner).await?;
        let amount_in = self.order_amount(side).await?;

        if amount_in == 0 {
            return Err(VolumeError::Amount(format!(
                "{} order size rounds to zero base units",
                side
            )));
        }

        let available = balances.spendable(side);
        if available < amount_in {
            warn!(
                "⚠️ Insufficient balance to {}: have {}, need {}",
                side,
                self.describe(side, available),
                self.describe(side, amount_in)
            );
            sleep(self.settings.insufficient_wait).await;
            return Ok((
                state.clone(),
                TickOutcome::Insufficient {
                    side,
                    needed: amount_in,
                    available,
                },
            ));
        }

        let order = SwapOrder::for_side(side, &self.token, amount_in, self.settings.slippage_bps);
        info!("💱 {} {} from {}", side, self.describe(side, amount_in), owner);

        let swapper = &self.swapper;
        let signer = state.account.keypair();
        let order = &order;
        let receipt = self
            .retry
            .execute("swap", move || swapper.execute(signer, order))
            .await?;

        let next = state.after_trade(side);
        info!(
            "✅ {} done (buys {}/{}, sells {}/{})",
            side,
            next.buy_count,
            self.settings.quota.buys,
            next.sell_count,
            self.settings.quota.sells
        );

        let wait = self.draw_wait();
        debug!("Waiting {}ms before next order", wait.as_millis());
        sleep(wait).await;

        Ok((
            next,
            TickOutcome::Traded {
                side,
                amount_in,
                amount_out: receipt.output_amount(),
            },
        ))
    }

    /// Draw a random order size in the input asset's base units
    async fn order_amount(&mut self, side: Side) -> VolumeResult<u64> {
        let lamports = draw_between(
            &mut *self.rng,
            self.settings.min_order,
            self.settings.max_order,
        );

        if side == Side::Buy {
            return Ok(lamports);
        }

        let drawn = to_ui_amount(lamports, SOL_DECIMALS)?;
        let tokens = match self.settings.sell_sizing {
            SellSizing::TokenUnits => drawn,
            SellSizing::NativeEquivalent => self.native_to_tokens(drawn).await?,
        };
        to_base_units(tokens, self.token.decimals())
    }

    async fn native_to_tokens(&self, sol: Decimal) -> VolumeResult<Decimal> {
        let oracle = &self.prices;
        let mints = [NATIVE_MINT, self.token.address];
        let mints = &mints;
        let prices = self
            .retry
            .execute("prices", move || oracle.prices(mints))
            .await?;

        let sol_price = require_price(&prices, &NATIVE_MINT)?;
        let token_price = require_price(&prices, &self.token.address)?;

        sol.checked_mul(sol_price)
            .and_then(|usd| usd.checked_div(token_price))
            .ok_or_else(|| {
                VolumeError::Amount(format!(
                    "cannot convert {} SOL at {} / {}",
                    sol, sol_price, token_price
                ))
            })
    }

    async fn read_balances(&self, owner: &Pubkey) -> VolumeResult<Balances> {
        let oracle = &self.balances;
        self.retry
            .execute("balance", move || oracle.balance_of(owner))
            .await
    }

    fn draw_wait(&mut self) -> Duration {
        Duration::from_millis(draw_between(
            &mut *self.rng,
            self.settings.min_wait_ms,
            self.settings.max_wait_ms,
        ))
    }

    fn describe(&self, side: Side, amount: u64) -> String {
        match side {
            Side::Buy => format!("{} SOL", format_sol(amount)),
            Side::Sell => format!("{} tokens", format_token(amount, self.token.decimals())),
        }
    }
}
