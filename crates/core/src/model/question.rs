use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ContentLimits;
use crate::model::text::{clamp_explanation, clamp_option, clamp_sentence};

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("invalid question data: not an object")]
    NotAnObject,

    #[error("invalid question: missing or empty sentence")]
    MissingSentence,

    #[error("invalid question: options must be an array of 5 items")]
    OptionArity,

    #[error("invalid question: option {0} is not a string")]
    OptionNotString(usize),

    #[error("invalid question: correctIndex must be 0-4")]
    CorrectIndexOutOfRange,

    #[error("invalid question: explanations must be an array")]
    ExplanationsNotArray,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated fill-in-the-blank question.
///
/// Construct through [`Question::from_value`] (untrusted payloads) or
/// [`Question::new`]; both guarantee `correct_index < OPTION_COUNT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    sentence: String,
    options: [String; OPTION_COUNT],
    correct_index: usize,
    explanations: Option<[String; OPTION_COUNT]>,
}

impl Question {
    /// Build a question from already-trusted parts.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the sentence is blank or the index is out of range.
    pub fn new(
        sentence: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct_index: usize,
        explanations: Option<[String; OPTION_COUNT]>,
    ) -> Result<Self, QuestionError> {
        let sentence = sentence.into();
        if sentence.trim().is_empty() {
            return Err(QuestionError::MissingSentence);
        }
        if correct_index >= OPTION_COUNT {
            return Err(QuestionError::CorrectIndexOutOfRange);
        }
        Ok(Self {
            sentence,
            options,
            correct_index,
            explanations,
        })
    }

    /// Validate an untrusted JSON object and clamp its text to `limits`.
    ///
    /// Explanation entries that are not strings are kept as empty strings, and
    /// the list is padded or cut to line up with the options.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` describing the first schema violation.
    pub fn from_value(value: &Value, limits: &ContentLimits) -> Result<Self, QuestionError> {
        let object = value.as_object().ok_or(QuestionError::NotAnObject)?;

        let sentence = object
            .get("sentence")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or(QuestionError::MissingSentence)?;

        let raw_options = object
            .get("options")
            .and_then(Value::as_array)
            .filter(|opts| opts.len() == OPTION_COUNT)
            .ok_or(QuestionError::OptionArity)?;
        let mut options: [String; OPTION_COUNT] = Default::default();
        for (idx, raw) in raw_options.iter().enumerate() {
            let text = raw.as_str().ok_or(QuestionError::OptionNotString(idx))?;
            options[idx] = clamp_option(text, limits.max_option_length);
        }

        let correct_index = object
            .get("correctIndex")
            .and_then(as_index)
            .filter(|idx| *idx < OPTION_COUNT)
            .ok_or(QuestionError::CorrectIndexOutOfRange)?;

        let explanations = match object.get("explanations") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let mut out: [String; OPTION_COUNT] = Default::default();
                for (slot, item) in out.iter_mut().zip(items) {
                    if let Some(text) = item.as_str() {
                        *slot = clamp_explanation(text, limits.max_explanation_length);
                    }
                }
                Some(out)
            }
            Some(_) => return Err(QuestionError::ExplanationsNotArray),
        };

        Ok(Self {
            sentence: clamp_sentence(sentence, limits.max_sentence_length),
            options,
            correct_index,
            explanations,
        })
    }

    #[must_use]
    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    #[must_use]
    pub fn explanations(&self) -> Option<&[String; OPTION_COUNT]> {
        self.explanations.as_ref()
    }

    /// Explanation for the option at `index`, if one was provided and is non-empty.
    #[must_use]
    pub fn explanation(&self, index: usize) -> Option<&str> {
        self.explanations
            .as_ref()
            .and_then(|all| all.get(index))
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    /// Shuffle options (and their explanations) in place.
    ///
    /// `correct_index` is recomputed so it still points at the originally
    /// correct option.
    pub fn shuffle_options<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: [usize; OPTION_COUNT] = [0, 1, 2, 3, 4];
        order.shuffle(rng);

        let options = std::mem::take(&mut self.options);
        self.options = order.map(|from| options[from].clone());

        if let Some(explanations) = self.explanations.take() {
            self.explanations = Some(order.map(|from| explanations[from].clone()));
        }

        // `order` is a permutation of 0..OPTION_COUNT, so the old index is always found.
        if let Some(new_index) = order.iter().position(|from| *from == self.correct_index) {
            self.correct_index = new_index;
        }
    }
}

fn as_index(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= 0.0 && f < OPTION_COUNT as f64 {
        // Bounded by OPTION_COUNT above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Some(f as usize);
    }
    None
}
