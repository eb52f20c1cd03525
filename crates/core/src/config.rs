//! Configuration module for the volume bot
//!
//! Trading parameters come from a JSON file; the RPC endpoint may be
//! overridden from the environment. Secrets are never part of this struct.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{VolumeError, VolumeResult};
use crate::types::{SellSizing, Side};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Application configuration, validated once and immutable afterwards
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Solana RPC URL
    pub rpc_url: String,
    /// Mint of the traded token
    pub token_address: String,
    /// Slippage tolerance in percent (0.5 => 0.5%)
    pub slippage: Decimal,
    pub consecutive_buys: u32,
    pub consecutive_sells: u32,
    /// Minimum wait between orders, seconds
    pub wait_time_min: Decimal,
    /// Maximum wait between orders, seconds
    pub wait_time_max: Decimal,
    /// Minimum random order size, SOL
    pub min_sol: Decimal,
    /// Maximum random order size, SOL
    pub max_sol: Decimal,
    pub start_with_buy: bool,

    #[serde(default)]
    pub sell_sizing: SellSizing,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_decoded_path")]
    pub decoded_path: PathBuf,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_insufficient_wait_ms")]
    pub insufficient_wait_ms: u64,
    /// Share of both balances moved to the next wallet on rotation
    #[serde(default = "default_sweep_percent")]
    pub sweep_percent: u8,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_restart_limit")]
    pub restart_limit: u32,
    #[serde(default = "default_restart_pause_secs")]
    pub restart_pause_secs: u64,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("solana-wallets.txt")
}

fn default_decoded_path() -> PathBuf {
    PathBuf::from("solana-decoded-wallets.txt")
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_insufficient_wait_ms() -> u64 {
    2_000
}

fn default_sweep_percent() -> u8 {
    99
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_restart_limit() -> u32 {
    3
}

fn default_restart_pause_secs() -> u64 {
    30
}

impl Config {
    /// Load from `CONFIG_PATH` (default `config.json`) and apply env overrides
    pub fn load() -> VolumeResult<Self> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;

        if let Ok(rpc_url) = env::var("SOLANA_RPC_URL") {
            if !rpc_url.trim().is_empty() {
                config.rpc_url = rpc_url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> VolumeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VolumeError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> VolumeResult<Self> {
        let mut config: Config = serde_json::from_str(raw)
            .map_err(|e| VolumeError::Config(format!("invalid config: {}", e)))?;
        config.rpc_url = config.rpc_url.trim().to_string();
        config.token_address = config.token_address.trim().to_string();
        Ok(config)
    }

    pub fn validate(&self) -> VolumeResult<()> {
        let url = url::Url::parse(&self.rpc_url)
            .map_err(|e| VolumeError::Config(format!("rpc_url is not a valid URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VolumeError::Config(format!(
                "rpc_url must be http(s), got {}",
                url.scheme()
            )));
        }

        self.token_mint()?;

        if self.slippage <= Decimal::ZERO || self.slippage >= Decimal::ONE_HUNDRED {
            return Err(VolumeError::Config(format!(
                "slippage must be within (0, 100) percent, got {}",
                self.slippage
            )));
        }

        if self.consecutive_buys == 0 && self.consecutive_sells == 0 {
            return Err(VolumeError::Config(
                "consecutive_buys and consecutive_sells cannot both be 0".to_string(),
            ));
        }

        for (name, value) in [
            ("min_sol", self.min_sol),
            ("max_sol", self.max_sol),
            ("wait_time_min", self.wait_time_min),
            ("wait_time_max", self.wait_time_max),
        ] {
            if value <= Decimal::ZERO {
                return Err(VolumeError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.min_sol > self.max_sol {
            return Err(VolumeError::Config(format!(
                "min_sol ({}) exceeds max_sol ({})",
                self.min_sol, self.max_sol
            )));
        }

        if self.wait_time_min > self.wait_time_max {
            return Err(VolumeError::Config(format!(
                "wait_time_min ({}) exceeds wait_time_max ({})",
                self.wait_time_min, self.wait_time_max
            )));
        }

        if self.sweep_percent == 0 || self.sweep_percent > 100 {
            return Err(VolumeError::Config(format!(
                "sweep_percent must be within 1..=100, got {}",
                self.sweep_percent
            )));
        }

        Ok(())
    }

    pub fn token_mint(&self) -> VolumeResult<Pubkey> {
        Pubkey::from_str(&self.token_address)
            .map_err(|e| VolumeError::Config(format!("invalid token_address: {}", e)))
    }

    pub fn start_side(&self) -> Side {
        Side::from_start_with_buy(self.start_with_buy)
    }

    /// Percent slippage expressed in basis points
    pub fn slippage_bps(&self) -> VolumeResult<u16> {
        (self.slippage * Decimal::ONE_HUNDRED)
            .round()
            .to_u16()
            .ok_or_else(|| VolumeError::Config(format!("slippage {} out of range", self.slippage)))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn insufficient_wait(&self) -> Duration {
        Duration::from_millis(self.insufficient_wait_ms)
    }

    pub fn restart_pause(&self) -> Duration {
        Duration::from_secs(self.restart_pause_secs)
    }
}
