#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;
pub mod time;

pub use config::{ConfigError, ContentLimits, QuizConfig};
pub use time::Clock;
