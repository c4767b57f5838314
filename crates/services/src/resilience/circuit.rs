use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use vocab_core::Clock;

use crate::error::FetchError;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { until: DateTime<Utc> },
}

#[derive(Debug, Default)]
struct Counters {
    consecutive_failures: u32,
    open_until: Option<DateTime<Utc>>,
}

/// Consecutive-failure circuit breaker.
///
/// Opens once `threshold` terminal failures happen in a row and rejects calls
/// until `cooldown` has elapsed. The first check after the cooldown closes it
/// again with the failure count reset. Any success resets the count.
#[derive(Debug)]
pub struct CircuitBreaker {
    clock: Clock,
    threshold: u32,
    cooldown: Duration,
    counters: Mutex<Counters>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(clock: Clock, threshold: u32, cooldown: Duration) -> Self {
        Self {
            clock,
            threshold: threshold.max(1),
            cooldown,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Gate a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::CircuitOpen` with the whole seconds left while the
    /// breaker is open.
    pub fn check(&self) -> Result<(), FetchError> {
        let now = self.clock.now();
        let mut counters = self.lock();
        if counters.consecutive_failures < self.threshold {
            return Ok(());
        }

        match counters.open_until {
            Some(until) if now < until => {
                let millis = (until - now).num_milliseconds().max(0);
                let wait_secs = u64::try_from(millis).unwrap_or(0).div_ceil(1000);
                Err(FetchError::CircuitOpen { wait_secs })
            }
            _ => {
                info!("circuit breaker cooled down; closing");
                counters.consecutive_failures = 0;
                counters.open_until = None;
                Ok(())
            }
        }
    }

    pub fn record_success(&self) {
        let mut counters = self.lock();
        counters.consecutive_failures = 0;
        counters.open_until = None;
    }

    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut counters = self.lock();
        counters.consecutive_failures = counters.consecutive_failures.saturating_add(1);
        if counters.consecutive_failures >= self.threshold {
            let cooldown = chrono::Duration::from_std(self.cooldown)
                .unwrap_or_else(|_| chrono::Duration::seconds(60));
            counters.open_until = Some(now + cooldown);
            warn!(
                failures = counters.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker opened"
            );
        }
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Current state, without the side effect of closing an expired breaker.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let now = self.clock.now();
        let counters = self.lock();
        match counters.open_until {
            Some(until)
                if counters.consecutive_failures >= self.threshold && now < until =>
            {
                CircuitState::Open { until }
            }
            _ => CircuitState::Closed,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
