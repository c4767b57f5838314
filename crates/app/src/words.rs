use std::path::Path;

use anyhow::{Context, Result, bail};

/// Study list used when no `--words` file is given.
pub const DEFAULT_WORDS: &[&str] = &[
    "abate",
    "abundant",
    "accelerate",
    "accumulate",
    "acquire",
    "adequate",
    "adverse",
    "allocate",
    "ambiguous",
    "anticipate",
    "arbitrary",
    "assess",
    "attain",
    "coherent",
    "compensate",
    "comply with",
    "comprehensive",
    "consistent",
    "contradict",
    "crucial",
    "deteriorate",
    "diminish",
    "dispose of",
    "elicit",
    "eliminate",
    "emerge",
    "enhance",
    "evident",
    "exceed",
    "feasible",
    "hinder",
    "in accordance with",
    "inevitable",
    "mitigate",
    "notwithstanding",
    "obsolete",
    "persist",
    "prevail",
    "refrain from",
    "reluctant",
    "scarce",
    "substantial",
    "sustain",
    "take into account",
    "thereby",
    "undermine",
    "vulnerable",
    "whereas",
];

/// Read one word or expression per line; blank lines and `#` comments are
/// skipped.
pub fn load_words(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading word list {}", path.display()))?;
    let words = parse_words(&raw);
    if words.is_empty() {
        bail!("word list {} is empty", path.display());
    }
    Ok(words)
}

pub fn default_words() -> Vec<String> {
    DEFAULT_WORDS.iter().map(|w| (*w).to_string()).collect()
}

fn parse_words(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blanks_are_skipped() {
        let words = parse_words("# YDS list\nabate\n\n  take into account  \n");
        assert_eq!(words, vec!["abate", "take into account"]);
    }
}
