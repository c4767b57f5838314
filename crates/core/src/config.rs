use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Endpoint of the question-generation proxy used when nothing overrides it.
pub const DEFAULT_ENDPOINT: &str = "https://test.yds.today/.netlify/functions/generate-question";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("retry attempts must be at least 1")]
    ZeroRetryAttempts,

    #[error("circuit breaker threshold must be at least 1")]
    ZeroBreakerThreshold,

    #[error("words per streak must be at least 1")]
    ZeroWordsPerStreak,
}

/// Tunables for request resilience, streak tracking, and content clamping.
///
/// `Default` carries the production values; every field can be overridden
/// through `YDS_*` environment variables via [`QuizConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub endpoint: String,
    /// Per-request timeout on wifi.
    pub api_timeout: Duration,
    /// Per-request timeout on a slow cellular link.
    pub cellular_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout: Duration,
    pub bridge_timeout: Duration,
    pub debounce_delay: Duration,
    pub words_per_streak: u32,
    pub limits: ContentLimits,
}

/// Maximum lengths (in characters) applied to generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    pub max_sentence_length: usize,
    pub max_option_length: usize,
    pub max_explanation_length: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_sentence_length: 150,
            max_option_length: 50,
            max_explanation_length: 120,
        }
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_timeout: Duration::from_millis(30_000),
            cellular_timeout: Duration::from_millis(60_000),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1_000),
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_millis(60_000),
            bridge_timeout: Duration::from_millis(2_000),
            debounce_delay: Duration::from_millis(300),
            words_per_streak: 20,
            limits: ContentLimits::default(),
        }
    }
}

impl QuizConfig {
    /// Build a config from defaults overridden by `YDS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is present but unparsable, or
    /// when the resulting config fails [`QuizConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`QuizConfig::from_env`] but reading from an arbitrary source.
    ///
    /// # Errors
    ///
    /// See [`QuizConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("YDS_ENDPOINT").filter(|val| !val.trim().is_empty()) {
            config.endpoint = endpoint.trim().to_string();
        }
        if let Some(ms) = read_u64(&lookup, "YDS_API_TIMEOUT_MS")? {
            config.api_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_u64(&lookup, "YDS_CELLULAR_TIMEOUT_MS")? {
            config.cellular_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = read_u32(&lookup, "YDS_RETRY_ATTEMPTS")? {
            config.retry_attempts = n;
        }
        if let Some(ms) = read_u64(&lookup, "YDS_RETRY_DELAY_MS")? {
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(n) = read_u32(&lookup, "YDS_BREAKER_THRESHOLD")? {
            config.circuit_breaker_threshold = n;
        }
        if let Some(ms) = read_u64(&lookup, "YDS_BREAKER_TIMEOUT_MS")? {
            config.circuit_breaker_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_u64(&lookup, "YDS_BRIDGE_TIMEOUT_MS")? {
            config.bridge_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = read_u32(&lookup, "YDS_WORDS_PER_STREAK")? {
            config.words_per_streak = n;
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the endpoint (CLI flags layer over env).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check invariants that the rest of the system relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.endpoint).is_err() {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(ConfigError::ZeroBreakerThreshold);
        }
        if self.words_per_streak == 0 {
            return Err(ConfigError::ZeroWordsPerStreak);
        }
        Ok(())
    }
}

fn read_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { var, raw })
}

fn read_u32(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u32>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { var, raw })
}
