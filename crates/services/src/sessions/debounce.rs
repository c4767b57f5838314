use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::Clock;

/// Drops repeats of a user action that arrive within `delay` of the last
/// accepted one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    clock: Clock,
    delay: Duration,
    last: Option<DateTime<Utc>>,
}

impl Debouncer {
    #[must_use]
    pub fn new(clock: Clock, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            last: None,
        }
    }

    /// Returns `true` and arms the window if the action may proceed.
    pub fn allow(&mut self) -> bool {
        let now = self.clock.now();
        if let Some(last) = self.last {
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.delay {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}
