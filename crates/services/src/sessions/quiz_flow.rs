use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use vocab_core::model::{AnswerOutcome, Question, QuizSession, StreakStatus, StudyMode};

use super::debounce::Debouncer;
use crate::error::StudyError;
use crate::orchestrator::RequestOrchestrator;
use crate::streak_service::StreakService;

/// Result of answering a quiz question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAnswer {
    pub outcome: AnswerOutcome,
    pub streak: StreakStatus,
}

/// Quiz screen logic: pulls questions from the quiz slot, scores answers and
/// records one studied word per answered question.
pub struct QuizFlow {
    orchestrator: RequestOrchestrator,
    streaks: StreakService,
    session: QuizSession,
    debounce: Debouncer,
    rng: StdRng,
    current_word: Option<String>,
}

impl QuizFlow {
    #[must_use]
    pub fn new(
        orchestrator: RequestOrchestrator,
        streaks: StreakService,
        debounce: Debouncer,
    ) -> Self {
        Self {
            orchestrator,
            streaks,
            session: QuizSession::new(),
            debounce,
            rng: StdRng::from_os_rng(),
            current_word: None,
        }
    }

    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Start fetching the first question before the learner asks for it.
    pub fn warm_up(&self) -> bool {
        self.orchestrator.quiz().prefetch()
    }

    /// Show the next question, options shuffled.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Debounced` for a repeated request and
    /// `StudyError::Fetch` when no question could be loaded.
    pub async fn next_question(&mut self) -> Result<&Question, StudyError> {
        if !self.debounce.allow() {
            return Err(StudyError::Debounced);
        }
        let served = self.orchestrator.quiz().consume().await?;
        debug!(word = %served.word, "question shown");
        self.current_word = Some(served.word);
        Ok(self.session.present(served.content, &mut self.rng))
    }

    /// Answer the question on screen.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::Session` when nothing is shown, it was already
    /// answered, or the index is out of range.
    pub fn answer(&mut self, index: usize) -> Result<QuizAnswer, StudyError> {
        let outcome = self.session.answer(index)?;
        let streak = self.streaks.record_word(StudyMode::Quiz);
        Ok(QuizAnswer { outcome, streak })
    }

    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.session.current()
    }

    #[must_use]
    pub fn current_word(&self) -> Option<&str> {
        self.current_word.as_deref()
    }

    /// `(correct, total)`.
    #[must_use]
    pub fn score(&self) -> (u32, u32) {
        self.session.score()
    }

    pub fn reset(&mut self) {
        self.session.reset();
        self.current_word = None;
    }
}
