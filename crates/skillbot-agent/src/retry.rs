//! Exponential backoff for rate-limited provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use skillbot_core::config::RetryConfig;
use skillbot_providers::ProviderError;

/// Reply returned to the user when every attempt was rate limited.
pub const TIMEOUT_SENTINEL: &str = "Error: API Timeout.";

/// Result of a retried call that did not fail fatally.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Completed(T),
    /// Every attempt hit a rate limit.
    Exhausted,
}

/// Retries a provider request on rate-limit signals only.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Sleep after the first rate-limited attempt; doubles after each.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_secs(config.initial_delay_secs),
        }
    }

    /// Run `op` until it succeeds, fails with a non-rate-limit error, or
    /// the attempts are used up. A sleep follows every rate-limited attempt.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<RetryOutcome<T>, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut delay = self.initial_delay;

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => return Ok(RetryOutcome::Completed(value)),
                Err(e) if e.is_rate_limited() => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_secs = delay.as_secs(),
                        "Rate limit hit, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(RetryOutcome::Exhausted)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
