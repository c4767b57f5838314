use crate::error::FetchError;

const MAX_WORD_CHARS: usize = 100;

/// Escape a word for embedding in a quoted prompt string and bound its length.
///
/// # Errors
///
/// Returns `FetchError::NoWords` for a blank word.
pub fn sanitize_word(word: &str) -> Result<String, FetchError> {
    let word = word.trim();
    if word.is_empty() {
        return Err(FetchError::NoWords);
    }
    Ok(word
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .chars()
        .take(MAX_WORD_CHARS)
        .collect())
}

/// Prompt for one fill-in-the-blank question whose answer is `word`.
///
/// # Errors
///
/// Returns `FetchError::NoWords` for a blank word.
pub fn question_prompt(word: &str) -> Result<String, FetchError> {
    let word = sanitize_word(word)?;
    let type_hint = if word.contains(' ') {
        format!(
            "IMPORTANT: \"{word}\" is a multi-word expression. ALL 5 options must be \
             multi-word expressions of the same type. Do NOT mix single words with \
             multi-word expressions.\n\n"
        )
    } else {
        String::new()
    };

    Ok(format!(
        "You are an academic English instructor. Create ONE fill-in-the-blank question.\n\n\
         The correct answer MUST be: \"{word}\"\n\n\
         {type_hint}\
         Requirements:\n\
         - Write a concise sentence (15-25 words) where \"{word}\" is the ONLY natural fit in the blank _____\n\
         - Choose a context that matches the word's natural usage\n\
         - Provide exactly 5 options including \"{word}\", all of the same grammatical type\n\
         - \"{word}\" must be the correct answer (index 0)\n\
         - For EACH option, give a brief explanation (max 15 words) of why it is right or wrong\n\n\
         Respond ONLY with JSON in this exact shape:\n\
         {{\"sentence\": \"...\", \"options\": [\"{word}\", \"...\", \"...\", \"...\", \"...\"], \
         \"correctIndex\": 0, \"explanations\": [\"...\", \"...\", \"...\", \"...\", \"...\"]}}"
    ))
}

/// Prompt for a learner-friendly definition and one example sentence.
///
/// # Errors
///
/// Returns `FetchError::NoWords` for a blank word.
pub fn flashcard_prompt(word: &str) -> Result<String, FetchError> {
    let word = sanitize_word(word)?;
    Ok(format!(
        "For the English word/phrase \"{word}\" (commonly used in academic exam contexts), provide:\n\
         1. A clear, concise definition suitable for English language learners\n\
         2. One academic-style example sentence showing natural usage\n\n\
         Respond ONLY in this exact JSON format:\n\
         {{\"definition\": \"brief definition here\", \"example\": \"Example sentence here.\"}}\n\n\
         Keep the definition under 20 words. The example should be academic/formal in tone."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_escaped_and_bounded() {
        assert_eq!(sanitize_word(r#"say "hi""#).unwrap(), r#"say \"hi\""#);
        assert_eq!(sanitize_word(r"a\b").unwrap(), r"a\\b");
        assert_eq!(sanitize_word(&"x".repeat(150)).unwrap().chars().count(), 100);
        assert_eq!(sanitize_word("   "), Err(FetchError::NoWords));
    }

    #[test]
    fn multi_word_expressions_get_a_type_hint() {
        assert!(question_prompt("take into account").unwrap().contains("multi-word"));
        assert!(!question_prompt("abate").unwrap().contains("multi-word"));
        assert!(flashcard_prompt("abate").unwrap().contains("\"abate\""));
    }
}
