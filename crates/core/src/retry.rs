//! Resilient Executor
//!
//! `RetryPolicy` keeps retrying an action for as long as its failures are
//! retryable (funding gaps, transport errors, swap-provider rejections).
//! There is no attempt cap and no timeout; the bot is meant to sit out
//! liquidity and funding gaps unattended.
//!
//! `RestartPolicy` is the separate, bounded pause-and-retry wrapper used only
//! around the outermost run loop.

use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{VolumeError, VolumeResult};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` until it succeeds or fails with a non-retryable error
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut action: F) -> VolumeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = VolumeResult<T>>,
    {
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;

            match action().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Recovered after {} failed attempts", attempt - 1);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        operation,
                        attempt,
                        kind = %e.class(),
                        error = %e,
                        "⚠️ Attempt failed, retrying in {}ms",
                        self.delay.as_millis()
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => {
                    error!(
                        operation,
                        attempt,
                        kind = %e.class(),
                        error = %e,
                        "❌ Non-retryable failure"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Bounded restart allowance for the top-level session
#[derive(Debug)]
pub struct RestartPolicy {
    limit: u32,
    used: u32,
    pause: Duration,
}

impl RestartPolicy {
    pub fn new(limit: u32, pause: Duration) -> Self {
        Self {
            limit,
            used: 0,
            pause,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.limit - self.used
    }

    /// Spend one restart and pause, or return `false` once exhausted
    pub async fn allow(&mut self, cause: &VolumeError) -> bool {
        if self.used >= self.limit {
            error!(restarts = self.used, error = %cause, "Restart budget exhausted");
            return false;
        }

        self.used += 1;
        warn!(
            restart = self.used,
            limit = self.limit,
            error = %cause,
            "Session halted, restarting in {}s",
            self.pause.as_secs()
        );
        tokio::time::sleep(self.pause).await;
        true
    }
}
