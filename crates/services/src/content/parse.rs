//! Lenient JSON extraction from model output.
//!
//! Generated text is tried, in order, as plain JSON, as JSON with control
//! characters blanked out, as the body of a fenced code block, and as the
//! first `{...}` span mentioning the fields the caller expects.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

/// Which object the caller expects, used by the last-resort extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    Question,
    Flashcard,
}

/// The parsing stage that produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Direct,
    ControlCharsStripped,
    FencedBlock,
    EmbeddedObject,
}

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F]").expect("valid regex"));

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex"));

static QUESTION_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{.*"sentence".*"options".*\}"#).expect("valid regex")
});

static FLASHCARD_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{.*"definition".*"example".*\}"#).expect("valid regex")
});

/// Parse `text` into a JSON value, falling back through every stage.
///
/// # Errors
///
/// Returns `FetchError::Parse` when no stage yields valid JSON.
pub fn parse_generated(text: &str, shape: ExpectedShape) -> Result<(Value, ParseStage), FetchError> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok((value, ParseStage::Direct));
    }

    let cleaned = CONTROL_CHARS.replace_all(text, " ");
    if let Ok(value) = serde_json::from_str(&cleaned) {
        debug!("parsed generated content after blanking control characters");
        return Ok((value, ParseStage::ControlCharsStripped));
    }

    if let Some(body) = FENCED_BLOCK.captures(text).and_then(|caps| caps.get(1)) {
        if let Ok(value) = serde_json::from_str(body.as_str().trim()) {
            debug!("parsed generated content from a fenced block");
            return Ok((value, ParseStage::FencedBlock));
        }
    }

    let object = match shape {
        ExpectedShape::Question => &QUESTION_OBJECT,
        ExpectedShape::Flashcard => &FLASHCARD_OBJECT,
    };
    if let Some(span) = object.find(text) {
        let candidate = CONTROL_CHARS.replace_all(span.as_str(), " ");
        if let Ok(value) = serde_json::from_str(&candidate) {
            debug!("parsed generated content from an embedded object");
            return Ok((value, ParseStage::EmbeddedObject));
        }
    }

    debug!(len = text.len(), "generated content is not JSON");
    Err(FetchError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_json_parses_directly() {
        let (value, stage) =
            parse_generated(r#"{"definition":"d","example":"e"}"#, ExpectedShape::Flashcard)
                .unwrap();
        assert_eq!(stage, ParseStage::Direct);
        assert_eq!(value, json!({"definition": "d", "example": "e"}));
    }

    #[test]
    fn raw_newlines_inside_strings_are_blanked() {
        let text = "{\"definition\":\"line one\nline two\",\"example\":\"e\"}";
        let (value, stage) = parse_generated(text, ExpectedShape::Flashcard).unwrap();
        assert_eq!(stage, ParseStage::ControlCharsStripped);
        assert_eq!(value["definition"], "line one line two");
    }

    #[test]
    fn fenced_block_is_unwrapped() {
        let text = "```json\n{\"sentence\":\"The ___ fell.\",\"options\":[\"a\",\"b\",\"c\",\"d\",\"e\"],\"correctIndex\":0}\n```";
        let (value, stage) = parse_generated(text, ExpectedShape::Question).unwrap();
        assert_eq!(stage, ParseStage::FencedBlock);
        assert_eq!(value["correctIndex"], 0);
    }

    #[test]
    fn object_is_found_inside_prose() {
        let text = "Sure! Here you go: {\"sentence\":\"s\",\"options\":[\"a\",\"b\",\"c\",\"d\",\"e\"],\"correctIndex\":2} Hope it helps.";
        let (value, stage) = parse_generated(text, ExpectedShape::Question).unwrap();
        assert_eq!(stage, ParseStage::EmbeddedObject);
        assert_eq!(value["correctIndex"], 2);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert_eq!(
            parse_generated("I cannot help with that.", ExpectedShape::Question),
            Err(FetchError::Parse)
        );
    }
}
