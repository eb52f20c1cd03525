//! Error types for the volume trading system

use thiserror::Error;

/// Main error type for the volume trading system
#[derive(Error, Debug)]
pub enum VolumeError {
    /// Matches the system program's own wording so the text shim can read it back.
    #[error("insufficient lamports {available}, need {needed}")]
    InsufficientLamports { available: u64, needed: u64 },

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("insufficient tokens: {0}")]
    InsufficientTokens(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Swap provider rejected request: {0}")]
    SwapRejected(String),

    /// The provider will never accept this request as sent
    #[error("Invalid swap request: {0}")]
    SwapInvalid(String),

    #[error("Price fetch error: {0}")]
    PriceFetch(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Vault error: {0}")]
    Vault(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Amount error: {0}")]
    Amount(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Coarse classification used by the retry driver and by failure logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Not enough lamports or tokens right now
    Funding,
    /// HTTP or RPC transport failure
    Transport,
    /// Application-level rejection from the swap provider
    Rejection,
    Fatal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Funding => "funding",
            ErrorClass::Transport => "transport",
            ErrorClass::Rejection => "rejection",
            ErrorClass::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VolumeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            VolumeError::InsufficientLamports { .. }
            | VolumeError::InsufficientFunds(_)
            | VolumeError::InsufficientTokens(_) => ErrorClass::Funding,
            VolumeError::Transport(_) => ErrorClass::Transport,
            VolumeError::SwapRejected(_) => ErrorClass::Rejection,
            _ => ErrorClass::Fatal,
        }
    }

    /// Whether the resilient executor should wait and try again
    pub fn is_retryable(&self) -> bool {
        self.class() != ErrorClass::Fatal
    }

    /// Last-resort classifier for rejection prose coming back from RPC nodes.
    ///
    /// Collaborators should produce structured variants where they can; this
    /// only exists for messages that carry nothing but text, e.g. the system
    /// program's `Transfer: insufficient lamports 900, need 950` log line.
    pub fn from_rejection_text(message: &str) -> Self {
        let lower = message.to_lowercase();

        if let Some(pos) = lower.find("insufficient lamports") {
            let tail = &lower[pos + "insufficient lamports".len()..];
            let mut numbers = tail
                .split(|c: char| !c.is_ascii_digit())
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.parse::<u64>().ok());

            if let (Some(available), Some(needed)) = (numbers.next(), numbers.next()) {
                return VolumeError::InsufficientLamports { available, needed };
            }
            return VolumeError::InsufficientFunds(message.to_string());
        }

        if lower.contains("insufficient tokens") {
            return VolumeError::InsufficientTokens(message.to_string());
        }

        if lower.contains("insufficient funds") {
            return VolumeError::InsufficientFunds(message.to_string());
        }

        VolumeError::Rpc(message.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for VolumeError {
    fn from(e: reqwest::Error) -> Self {
        VolumeError::Transport(e.to_string())
    }
}

/// Result type alias for volume bot operations
pub type VolumeResult<T> = Result<T, VolumeError>;
