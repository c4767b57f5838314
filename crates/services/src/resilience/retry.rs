use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use vocab_core::QuizConfig;

use super::circuit::CircuitBreaker;
use super::connection::{ConnectionMonitor, ConnectionQuality};
use crate::error::FetchError;

/// How backoff delays are waited out.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Bounded attempts with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait before the attempt following `attempt` (1-based):
    /// `base * 2^(attempt - 1)`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

/// Runs fetch operations under the breaker, the retry policy and a
/// connection-dependent timeout.
pub struct ResilientExecutor {
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    connection: Arc<dyn ConnectionMonitor>,
    config: QuizConfig,
}

impl ResilientExecutor {
    #[must_use]
    pub fn new(
        breaker: Arc<CircuitBreaker>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        connection: Arc<dyn ConnectionMonitor>,
        config: &QuizConfig,
    ) -> Self {
        Self {
            breaker,
            policy,
            sleeper,
            connection,
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionQuality {
        self.connection.quality()
    }

    /// Run `operation` until it succeeds, fails terminally, or runs out of
    /// attempts. `operation` receives the 1-based attempt number.
    ///
    /// Only the terminal outcome touches the breaker. Dropping the returned
    /// future (cancellation) leaves the breaker untouched.
    ///
    /// # Errors
    ///
    /// Returns the terminal `FetchError`: `CircuitOpen` or `Offline` before
    /// any attempt, otherwise the error of the last attempt.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut + Send,
        Fut: Future<Output = Result<T, FetchError>> + Send,
        T: Send,
    {
        self.breaker.check()?;
        let quality = self.connection.quality();
        if quality == ConnectionQuality::Offline {
            return Err(FetchError::Offline);
        }
        let timeout = quality.request_timeout(&self.config);

        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(timeout, operation(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout),
            };

            match outcome {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.policy.attempts() => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "fetch failed; retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.counts_as_failure() {
                        self.breaker.record_failure();
                    }
                    debug!(attempt, %quality, error = %err, "fetch failed");
                    return Err(err);
                }
            }
        }
    }
}
