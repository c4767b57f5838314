//! Length clamping for generated text.
//!
//! All limits count characters, not bytes, so multi-byte input never splits
//! inside a code point.

const ELLIPSIS: &str = "...";

/// Explanations shorter than this are hard-cut instead of trimmed to a boundary.
const MIN_BOUNDARY_CHARS: usize = 50;

/// Clamp a question sentence, cutting at the last word boundary.
#[must_use]
pub fn clamp_sentence(text: &str, max_chars: usize) -> String {
    let Some(head) = head_if_longer(text, max_chars) else {
        return text.to_string();
    };
    match head.rfind(' ') {
        Some(idx) if idx > 0 => format!("{}{ELLIPSIS}", &head[..idx]),
        _ => format!("{head}{ELLIPSIS}"),
    }
}

/// Clamp an answer option with a hard cut.
#[must_use]
pub fn clamp_option(text: &str, max_chars: usize) -> String {
    match head_if_longer(text, max_chars) {
        Some(head) => format!("{head}{ELLIPSIS}"),
        None => text.to_string(),
    }
}

/// Clamp an explanation, preferring a sentence end, then a word boundary.
///
/// A boundary is only used when it leaves more than 50 characters of text.
#[must_use]
pub fn clamp_explanation(text: &str, max_chars: usize) -> String {
    let Some(head) = head_if_longer(text, max_chars) else {
        return text.to_string();
    };

    let mut last_terminator = None;
    let mut last_space = None;
    for (char_pos, (byte_idx, ch)) in head.char_indices().enumerate() {
        match ch {
            '.' | '!' | '?' => last_terminator = Some((char_pos, byte_idx + ch.len_utf8())),
            ' ' => last_space = Some((char_pos, byte_idx)),
            _ => {}
        }
    }

    if let Some((char_pos, end)) = last_terminator {
        if char_pos > MIN_BOUNDARY_CHARS {
            return head[..end].to_string();
        }
    }
    if let Some((char_pos, idx)) = last_space {
        if char_pos > MIN_BOUNDARY_CHARS {
            return head[..idx].to_string();
        }
    }
    format!("{head}{ELLIPSIS}")
}

/// Returns the first `max_chars` characters when `text` is longer than that.
fn head_if_longer(text: &str, max_chars: usize) -> Option<&str> {
    let (cut, _) = text.char_indices().nth(max_chars)?;
    Some(&text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(clamp_sentence("fits fine", 150), "fits fine");
        assert_eq!(clamp_option("abate", 50), "abate");
        assert_eq!(clamp_explanation("Short.", 120), "Short.");
    }

    #[test]
    fn sentence_is_cut_at_last_space() {
        let clamped = clamp_sentence("the quick brown fox jumps", 12);
        assert_eq!(clamped, "the quick...");
    }

    #[test]
    fn sentence_without_spaces_is_hard_cut() {
        assert_eq!(clamp_sentence("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn option_is_hard_cut_with_ellipsis() {
        assert_eq!(clamp_option("abcdefgh", 5), "abcde...");
    }

    #[test]
    fn explanation_prefers_sentence_end_past_fifty_chars() {
        let first = "'Mitigate' fits because the policy aims to lessen harm caused.";
        let text = format!("{first} It also pairs naturally with risks and consequences here.");
        let clamped = clamp_explanation(&text, 80);
        assert_eq!(clamped, first);
    }

    #[test]
    fn explanation_falls_back_to_word_boundary() {
        let text = "word ".repeat(40);
        let clamped = clamp_explanation(&text, 60);
        assert!(clamped.chars().count() <= 60);
        assert!(clamped.ends_with("word"));
    }

    #[test]
    fn explanation_with_early_boundaries_is_hard_cut() {
        let text = format!("Yes. {}", "x".repeat(200));
        let clamped = clamp_explanation(&text, 60);
        assert!(clamped.ends_with("..."));
        assert_eq!(clamped.chars().count(), 63);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "ğüşöçı".repeat(10);
        let clamped = clamp_option(&text, 7);
        assert_eq!(clamped.chars().count(), 10);
    }
}
