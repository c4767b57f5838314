//! Failure handling shared by every content fetch: connection-aware
//! timeouts, bounded retries with exponential backoff, and a circuit breaker.

mod circuit;
mod connection;
mod retry;

pub use circuit::{CircuitBreaker, CircuitState};
pub use connection::{ConnectionMonitor, ConnectionQuality, ConnectionState};
pub use retry::{ResilientExecutor, RetryPolicy, Sleeper, TokioSleeper};
