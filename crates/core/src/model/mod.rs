mod flashcard;
mod question;
mod session;
pub mod streak;
pub mod text;

pub use flashcard::{FlashcardContent, FlashcardError};
pub use question::{OPTION_COUNT, Question, QuestionError};
pub use session::{AnswerOutcome, FlashcardSession, QuizSession, SessionError, WordDeck};
pub use streak::{Rollover, StreakBook, StreakRecord, StreakStatus, StudyMode};
