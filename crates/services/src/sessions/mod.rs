mod debounce;
mod flashcard_flow;
mod quiz_flow;

// Public API of the study flows.
pub use crate::error::StudyError;
pub use debounce::Debouncer;
pub use flashcard_flow::{FlashcardCard, FlashcardFlow};
pub use quiz_flow::{QuizAnswer, QuizFlow};
