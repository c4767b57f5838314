//! Generated quiz and flashcard content: prompts, transport, lenient parsing
//! and validation.

mod client;
mod fetcher;
mod parse;
mod prompts;

pub use client::{ContentClient, HttpContentClient};
pub use fetcher::ContentFetcher;
pub use parse::{ExpectedShape, ParseStage, parse_generated};
pub use prompts::{flashcard_prompt, question_prompt, sanitize_word};
