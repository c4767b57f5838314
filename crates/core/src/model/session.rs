use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::model::question::{OPTION_COUNT, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no question is being shown")]
    NoQuestion,

    #[error("question already answered")]
    AlreadyAnswered,

    #[error("answer index must be 0-4, got {0}")]
    InvalidAnswer(usize),

    #[error("word list is empty")]
    EmptyWordList,
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Outcome of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub selected: usize,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Transient quiz state: score and the question on screen.
#[derive(Debug, Clone)]
pub struct QuizSession {
    correct: u32,
    total: u32,
    current: Option<Question>,
    has_answered: bool,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            correct: 0,
            total: 0,
            current: None,
            has_answered: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Put a fresh question on screen, shuffling its options.
    pub fn present<R: Rng + ?Sized>(&mut self, mut question: Question, rng: &mut R) -> &Question {
        question.shuffle_options(rng);
        self.has_answered = false;
        self.current.insert(question)
    }

    /// Answer the current question. Only the first answer counts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if nothing is shown, it was already answered, or
    /// `selected` is out of range.
    pub fn answer(&mut self, selected: usize) -> Result<AnswerOutcome, SessionError> {
        let question = self.current.as_ref().ok_or(SessionError::NoQuestion)?;
        if self.has_answered {
            return Err(SessionError::AlreadyAnswered);
        }
        if selected >= OPTION_COUNT {
            return Err(SessionError::InvalidAnswer(selected));
        }

        let is_correct = selected == question.correct_index();
        let outcome = AnswerOutcome {
            selected,
            correct_index: question.correct_index(),
            is_correct,
            explanation: question.explanation(selected).map(str::to_string),
        };

        self.has_answered = true;
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
        Ok(outcome)
    }

    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn has_answered(&self) -> bool {
        self.has_answered
    }

    /// `(correct, total)`.
    #[must_use]
    pub fn score(&self) -> (u32, u32) {
        (self.correct, self.total)
    }
}

//
// ─── FLASHCARDS ────────────────────────────────────────────────────────────────
//

/// Endless shuffled walk through a word list.
///
/// When the order is exhausted it reshuffles and starts over.
#[derive(Debug, Clone)]
pub struct WordDeck {
    words: Vec<String>,
    order: Vec<usize>,
    cursor: usize,
}

impl WordDeck {
    /// # Errors
    ///
    /// Returns `SessionError::EmptyWordList` if `words` is empty.
    pub fn new<R: Rng + ?Sized>(words: Vec<String>, rng: &mut R) -> Result<Self, SessionError> {
        if words.is_empty() {
            return Err(SessionError::EmptyWordList);
        }
        let mut deck = Self {
            order: (0..words.len()).collect(),
            words,
            cursor: 0,
        };
        deck.order.shuffle(rng);
        Ok(deck)
    }

    /// Next word in shuffled order.
    pub fn next_word<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &str {
        if self.cursor >= self.order.len() {
            self.order.shuffle(rng);
            self.cursor = 0;
        }
        let idx = self.order[self.cursor];
        self.cursor += 1;
        &self.words[idx]
    }

    /// A uniformly random word, independent of the shuffled order.
    pub fn random_word<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let idx = rng.random_range(0..self.words.len());
        &self.words[idx]
    }
}

/// Transient flashcard state: the word on screen and the known/seen tally.
#[derive(Debug, Clone, Default)]
pub struct FlashcardSession {
    current_word: Option<String>,
    known: u32,
    total: u32,
    rated: bool,
}

impl FlashcardSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn show(&mut self, word: impl Into<String>) {
        self.current_word = Some(word.into());
        self.rated = false;
    }

    /// Rate the current card as known or not. Only the first rating counts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if no card is shown or it was already rated.
    pub fn rate(&mut self, known: bool) -> Result<(), SessionError> {
        if self.current_word.is_none() {
            return Err(SessionError::NoQuestion);
        }
        if self.rated {
            return Err(SessionError::AlreadyAnswered);
        }
        self.rated = true;
        self.total += 1;
        if known {
            self.known += 1;
        }
        Ok(())
    }

    #[must_use]
    pub fn current_word(&self) -> Option<&str> {
        self.current_word.as_deref()
    }

    /// `(known, total)`.
    #[must_use]
    pub fn score(&self) -> (u32, u32) {
        (self.known, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn question() -> Question {
        Question::new(
            "Rain will _____ the drought.",
            ["end", "start", "dry", "burn", "pause"].map(String::from),
            0,
            None,
        )
        .unwrap()
    }

    #[test]
    fn quiz_answer_counts_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut session = QuizSession::new();
        assert_eq!(session.answer(0), Err(SessionError::NoQuestion));

        let correct = session.present(question(), &mut rng).correct_index();
        let outcome = session.answer(correct).unwrap();
        assert!(outcome.is_correct);
        assert_eq!(session.answer(correct), Err(SessionError::AlreadyAnswered));
        assert_eq!(session.score(), (1, 1));

        let correct = session.present(question(), &mut rng).correct_index();
        let wrong = (correct + 1) % OPTION_COUNT;
        assert!(!session.answer(wrong).unwrap().is_correct);
        assert_eq!(session.score(), (1, 2));
    }

    #[test]
    fn quiz_rejects_out_of_range_answer() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = QuizSession::new();
        session.present(question(), &mut rng);
        assert_eq!(session.answer(5), Err(SessionError::InvalidAnswer(5)));
        assert!(!session.has_answered());
    }

    #[test]
    fn deck_visits_every_word_before_reshuffling() {
        let mut rng = StdRng::seed_from_u64(3);
        let words: Vec<String> = ["a", "b", "c", "d"].map(String::from).to_vec();
        let mut deck = WordDeck::new(words, &mut rng).unwrap();

        let first_pass: HashSet<String> =
            (0..4).map(|_| deck.next_word(&mut rng).to_string()).collect();
        assert_eq!(first_pass.len(), 4);
        let second_pass: HashSet<String> =
            (0..4).map(|_| deck.next_word(&mut rng).to_string()).collect();
        assert_eq!(second_pass.len(), 4);
    }

    #[test]
    fn empty_deck_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            WordDeck::new(Vec::new(), &mut rng),
            Err(SessionError::EmptyWordList)
        ));
    }

    #[test]
    fn flashcard_rating_counts_once_per_card() {
        let mut session = FlashcardSession::new();
        assert_eq!(session.rate(true), Err(SessionError::NoQuestion));
        session.show("abate");
        session.rate(true).unwrap();
        assert_eq!(session.rate(false), Err(SessionError::AlreadyAnswered));
        session.show("brisk");
        session.rate(false).unwrap();
        assert_eq!(session.score(), (1, 2));
    }
}
