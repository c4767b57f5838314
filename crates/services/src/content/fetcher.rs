use std::sync::Arc;

use tracing::debug;

use vocab_core::ContentLimits;
use vocab_core::error::ContentError;
use vocab_core::model::{FlashcardContent, Question};

use super::client::ContentClient;
use super::parse::{ExpectedShape, parse_generated};
use super::prompts::{flashcard_prompt, question_prompt};
use crate::error::FetchError;
use crate::resilience::ResilientExecutor;

/// Fetches and validates generated content for one word.
///
/// Each call goes through the shared [`ResilientExecutor`], so quiz and
/// flashcard traffic trip the same breaker. Unparsable or invalid content
/// fails the attempt without a retry.
#[derive(Clone)]
pub struct ContentFetcher {
    client: Arc<dyn ContentClient>,
    executor: Arc<ResilientExecutor>,
    limits: ContentLimits,
}

impl ContentFetcher {
    #[must_use]
    pub fn new(
        client: Arc<dyn ContentClient>,
        executor: Arc<ResilientExecutor>,
        limits: ContentLimits,
    ) -> Self {
        Self {
            client,
            executor,
            limits,
        }
    }

    #[must_use]
    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    /// # Errors
    ///
    /// Returns the terminal `FetchError` after retries.
    pub async fn fetch_question(&self, word: &str) -> Result<Question, FetchError> {
        let prompt = question_prompt(word)?;
        let limits = self.limits;
        self.executor
            .execute(|attempt| {
                let client = Arc::clone(&self.client);
                let prompt = prompt.clone();
                async move {
                    debug!(attempt, "requesting question");
                    let text = client.complete(&prompt).await?;
                    let (value, stage) = parse_generated(&text, ExpectedShape::Question)?;
                    debug!(?stage, "question parsed");
                    Question::from_value(&value, &limits)
                        .map_err(|err| FetchError::Invalid(ContentError::from(err)))
                }
            })
            .await
    }

    /// # Errors
    ///
    /// Returns the terminal `FetchError` after retries.
    pub async fn fetch_flashcard(&self, word: &str) -> Result<FlashcardContent, FetchError> {
        let prompt = flashcard_prompt(word)?;
        let limits = self.limits;
        self.executor
            .execute(|attempt| {
                let client = Arc::clone(&self.client);
                let prompt = prompt.clone();
                async move {
                    debug!(attempt, "requesting flashcard");
                    let text = client.complete(&prompt).await?;
                    let (value, _) = parse_generated(&text, ExpectedShape::Flashcard)?;
                    FlashcardContent::from_value(&value, &limits)
                        .map_err(|err| FetchError::Invalid(ContentError::from(err)))
                }
            })
            .await
    }
}
