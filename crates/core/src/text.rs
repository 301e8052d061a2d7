//! Word-level text helpers shared by the fallback extractor and the lexicon.

/// Lowercase words: runs of alphanumerics and apostrophes.
/// Curly apostrophes are folded to `'`; leading/trailing quotes are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Whole-word phrase match: the phrase's tokens appear contiguously in `tokens`.
pub fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    let needle = tokenize(phrase);
    if needle.is_empty() || needle.len() > tokens.len() {
        return false;
    }
    tokens.windows(needle.len()).any(|w| w == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("I'm drowning... really!"), vec!["i'm", "drowning", "really"]);
        assert_eq!(tokenize("self-harm"), vec!["self", "harm"]);
        assert_eq!(tokenize("can\u{2019}t go on"), vec!["can't", "go", "on"]);
    }

    #[test]
    fn phrase_requires_whole_words() {
        let tokens = tokenize("I feel sadness today");
        assert!(!contains_phrase(&tokens, "sad"));
        let tokens = tokenize("I want to kill myself");
        assert!(contains_phrase(&tokens, "kill myself"));
        assert!(!contains_phrase(&tokens, "myself kill"));
    }

    #[test]
    fn empty_phrase_never_matches() {
        assert!(!contains_phrase(&tokenize("anything"), "  "));
    }
}
