use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ContentLimits;
use crate::model::text::clamp_explanation;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("invalid flashcard data: not an object")]
    NotAnObject,

    #[error("missing definition or example")]
    MissingField,
}

/// Definition and example sentence generated for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardContent {
    definition: String,
    example: String,
}

impl FlashcardContent {
    /// Validate an untrusted JSON object into flashcard content.
    ///
    /// Both fields are clamped like explanations.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError` if either field is missing or blank.
    pub fn from_value(value: &Value, limits: &ContentLimits) -> Result<Self, FlashcardError> {
        let object = value.as_object().ok_or(FlashcardError::NotAnObject)?;
        let field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| clamp_explanation(s, limits.max_explanation_length))
                .ok_or(FlashcardError::MissingField)
        };
        Ok(Self {
            definition: field("definition")?,
            example: field("example")?,
        })
    }

    #[must_use]
    pub fn new(definition: impl Into<String>, example: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            example: example.into(),
        }
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn example(&self) -> &str {
        &self.example
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requires_both_fields() {
        let limits = ContentLimits::default();
        let ok = FlashcardContent::from_value(
            &json!({"definition": "to reduce", "example": "Trees mitigate heat."}),
            &limits,
        )
        .unwrap();
        assert_eq!(ok.definition(), "to reduce");

        let missing = FlashcardContent::from_value(&json!({"definition": "to reduce"}), &limits);
        assert_eq!(missing, Err(FlashcardError::MissingField));

        let blank =
            FlashcardContent::from_value(&json!({"definition": "", "example": "x"}), &limits);
        assert_eq!(blank, Err(FlashcardError::MissingField));

        assert_eq!(
            FlashcardContent::from_value(&json!("text"), &limits),
            Err(FlashcardError::NotAnObject)
        );
    }
}
