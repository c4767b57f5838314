use vocab_core::model::{FlashcardContent, FlashcardSession, StreakStatus, StudyMode};

use super::debounce::Debouncer;
use crate::error::StudyError;
use crate::orchestrator::RequestOrchestrator;
use crate::streak_service::StreakService;

/// A card ready to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardCard {
    pub word: String,
    pub content: FlashcardContent,
}

/// Flashcard screen logic: pulls cards from the flashcard slot and records
/// one studied word per rated card.
pub struct FlashcardFlow {
    orchestrator: RequestOrchestrator,
    streaks: StreakService,
    session: FlashcardSession,
    debounce: Debouncer,
}

impl FlashcardFlow {
    #[must_use]
    pub fn new(
        orchestrator: RequestOrchestrator,
        streaks: StreakService,
        debounce: Debouncer,
    ) -> Self {
        Self {
            orchestrator,
            streaks,
            session: FlashcardSession::new(),
            debounce,
        }
    }

    pub fn warm_up(&self) -> bool {
        self.orchestrator.flashcard().prefetch()
    }

    /// Show the next card. Prefetched content is served without waiting.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Debounced` for a repeated request and
    /// `StudyError::Fetch` when the card could not be loaded; the same word
    /// is tried again next time.
    pub async fn next_card(&mut self) -> Result<FlashcardCard, StudyError> {
        if !self.debounce.allow() {
            return Err(StudyError::Debounced);
        }
        let served = self.orchestrator.flashcard().consume().await?;
        self.session.show(served.word.clone());
        Ok(FlashcardCard {
            word: served.word,
            content: served.content,
        })
    }

    /// Rate the card on screen as known or not.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Session` when no card is shown or it was already
    /// rated.
    pub fn rate(&mut self, known: bool) -> Result<StreakStatus, StudyError> {
        self.session.rate(known)?;
        Ok(self.streaks.record_word(StudyMode::Flashcard))
    }

    #[must_use]
    pub fn current_word(&self) -> Option<&str> {
        self.session.current_word()
    }

    /// `(known, total)`.
    #[must_use]
    pub fn score(&self) -> (u32, u32) {
        self.session.score()
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }
}
