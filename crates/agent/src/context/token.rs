//! Context size measurement.
//!
//! The budget is counted in whitespace-delimited words, not model tokens.
//! Words undercount BPE tokens for code-heavy text, so the configured
//! limit should leave headroom below the model's real window.

/// Number of whitespace-delimited words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Whether the measured context and input fit in `limit` words. The limit
/// itself is allowed.
pub fn within_budget(context_words: usize, input_words: usize, limit: usize) -> bool {
    context_words + input_words <= limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  \n\t "), 0);
    }

    #[test]
    fn any_whitespace_separates_words() {
        assert_eq!(word_count("User: hi\nBot:  hello there"), 5);
    }

    #[test]
    fn punctuation_stays_attached() {
        assert_eq!(word_count("CI/CD, REST-ful APIs."), 3);
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(within_budget(word_count("a b"), word_count("c"), 3));
        assert!(!within_budget(word_count("a b"), word_count("c d"), 3));
    }
}
