//! Shared error types for the services crate.

use thiserror::Error;

use storage::sqlite::SqliteInitError;
use vocab_core::ConfigError;
use vocab_core::error::ContentError;
use vocab_core::model::SessionError;

use crate::resilience::ConnectionQuality;

/// Terminal outcome of a content fetch.
///
/// `Display` gives the message shown to the learner. Timeouts, network
/// failures and the circuit breaker have connection-specific variants through
/// [`FetchError::user_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    #[error("Request timed out. Please check your connection.")]
    Timeout,

    #[error("Request was cancelled.")]
    Aborted,

    #[error("You're offline. Please check your internet connection.")]
    Offline,

    #[error("Network error: {0}")]
    Network(String),

    #[error("{}", status_message(*status))]
    Http { status: u16 },

    #[error("Invalid response format from the question service: {0}")]
    MalformedResponse(String),

    #[error("Could not read the generated content. Please try again.")]
    Parse,

    #[error("Generated content was incomplete: {0}")]
    Invalid(#[from] ContentError),

    #[error("Too many failures. Please wait {wait_secs} seconds before trying again.")]
    CircuitOpen { wait_secs: u64 },

    #[error("No words are available to study.")]
    NoWords,
}

impl FetchError {
    /// Worth another attempt: timeouts, transport failures, throttling and 5xx.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Http { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this outcome advances the circuit breaker.
    ///
    /// Cancellation, offline short-circuits and breaker rejections are
    /// neutral; so is a missing word list, which never reached the network.
    #[must_use]
    pub fn counts_as_failure(&self) -> bool {
        !matches!(
            self,
            FetchError::Aborted
                | FetchError::Offline
                | FetchError::CircuitOpen { .. }
                | FetchError::NoWords
        )
    }

    /// Message tailored to the connection the request went out on.
    #[must_use]
    pub fn user_message(&self, quality: ConnectionQuality) -> String {
        match (self, quality) {
            (FetchError::Timeout, ConnectionQuality::Cellular) => {
                "Request timed out. Your cellular connection is slow; try WiFi for faster loading."
                    .to_string()
            }
            (FetchError::Timeout, _) => {
                "Request timed out. The server is taking too long, please try again.".to_string()
            }
            (FetchError::Network(_), ConnectionQuality::Cellular) => {
                "Network error on cellular data. Please check your signal and try again."
                    .to_string()
            }
            (FetchError::Network(_), ConnectionQuality::Offline) | (FetchError::Offline, _) => {
                FetchError::Offline.to_string()
            }
            (FetchError::Network(_), _) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            (FetchError::MalformedResponse(_) | FetchError::Invalid(_), _) => {
                FetchError::Parse.to_string()
            }
            _ => self.to_string(),
        }
    }
}

fn status_message(status: u16) -> String {
    match status {
        400 => "Invalid request. Please try again.".to_string(),
        401 => "Authentication failed. Please contact support.".to_string(),
        404 => "Question service not found. Please try again later.".to_string(),
        429 => "Too many requests. Please wait a moment.".to_string(),
        500..=599 => "Server is busy. Please try again in a moment.".to_string(),
        other => format!("Server error ({other})"),
    }
}

/// Errors emitted by the study flows.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("action ignored: repeated within the debounce window")]
    Debounced,
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::Http { status: 503 }.is_retryable());
        assert!(FetchError::Http { status: 429 }.is_retryable());
        assert!(!FetchError::Http { status: 400 }.is_retryable());
        assert!(!FetchError::Http { status: 404 }.is_retryable());
        assert!(!FetchError::MalformedResponse("no choices".into()).is_retryable());
        assert!(!FetchError::Parse.is_retryable());
        assert!(!FetchError::Offline.is_retryable());
    }

    #[test]
    fn neutral_outcomes_do_not_count() {
        assert!(!FetchError::Aborted.counts_as_failure());
        assert!(!FetchError::Offline.counts_as_failure());
        assert!(!FetchError::CircuitOpen { wait_secs: 3 }.counts_as_failure());
        assert!(FetchError::Parse.counts_as_failure());
        assert!(FetchError::Http { status: 400 }.counts_as_failure());
    }

    #[test]
    fn messages_keep_stable_wording() {
        assert!(FetchError::Timeout.to_string().contains("timed out"));
        assert!(FetchError::Offline.to_string().contains("offline"));
        assert!(
            FetchError::Http { status: 502 }
                .to_string()
                .contains("busy")
        );
        assert_eq!(FetchError::Http { status: 418 }.to_string(), "Server error (418)");
        assert!(
            FetchError::CircuitOpen { wait_secs: 42 }
                .to_string()
                .starts_with("Too many failures. Please wait 42 seconds")
        );
        assert!(
            FetchError::Parse
                .to_string()
                .to_lowercase()
                .contains("could not read")
        );
    }

    #[test]
    fn timeout_message_depends_on_connection() {
        let cellular = FetchError::Timeout.user_message(ConnectionQuality::Cellular);
        let wifi = FetchError::Timeout.user_message(ConnectionQuality::Wifi);
        assert!(cellular.contains("cellular"));
        assert!(cellular.contains("timed out"));
        assert!(wifi.contains("timed out"));
        assert_ne!(cellular, wifi);
    }
}
