use thiserror::Error;

use crate::model::{FlashcardError, QuestionError};

/// Any validation failure of generated content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
}
