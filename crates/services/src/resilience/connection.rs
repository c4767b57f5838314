use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use vocab_core::QuizConfig;

/// What the device is currently connected through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionQuality {
    Wifi,
    Cellular,
    Offline,
}

impl ConnectionQuality {
    /// Per-request timeout for this connection. Slow links get the long one.
    #[must_use]
    pub fn request_timeout(self, config: &QuizConfig) -> Duration {
        match self {
            ConnectionQuality::Cellular => config.cellular_timeout,
            ConnectionQuality::Wifi | ConnectionQuality::Offline => config.api_timeout,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ConnectionQuality::Wifi => 0,
            ConnectionQuality::Cellular => 1,
            ConnectionQuality::Offline => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionQuality::Cellular,
            2 => ConnectionQuality::Offline,
            _ => ConnectionQuality::Wifi,
        }
    }
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionQuality::Wifi => f.write_str("wifi"),
            ConnectionQuality::Cellular => f.write_str("cellular"),
            ConnectionQuality::Offline => f.write_str("offline"),
        }
    }
}

/// Source of the current connection quality, read once per request.
pub trait ConnectionMonitor: Send + Sync {
    fn quality(&self) -> ConnectionQuality;
}

/// Connection quality pushed in by the host shell.
///
/// Clones share the same value.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    quality: Arc<AtomicU8>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(ConnectionQuality::Wifi)
    }
}

impl ConnectionState {
    #[must_use]
    pub fn new(initial: ConnectionQuality) -> Self {
        Self {
            quality: Arc::new(AtomicU8::new(initial.to_u8())),
        }
    }

    pub fn set(&self, quality: ConnectionQuality) {
        self.quality.store(quality.to_u8(), Ordering::SeqCst);
    }
}

impl ConnectionMonitor for ConnectionState {
    fn quality(&self) -> ConnectionQuality {
        ConnectionQuality::from_u8(self.quality.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cellular_gets_the_long_timeout() {
        let config = QuizConfig::default();
        assert_eq!(
            ConnectionQuality::Cellular.request_timeout(&config),
            Duration::from_secs(60)
        );
        assert_eq!(
            ConnectionQuality::Wifi.request_timeout(&config),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn state_is_shared_between_clones() {
        let state = ConnectionState::default();
        let handle = state.clone();
        handle.set(ConnectionQuality::Offline);
        assert_eq!(state.quality(), ConnectionQuality::Offline);
        handle.set(ConnectionQuality::Cellular);
        assert_eq!(state.quality(), ConnectionQuality::Cellular);
    }
}
