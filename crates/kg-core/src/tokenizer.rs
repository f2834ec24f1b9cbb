//! Injected tokenizer for budget-aware serialization (spec §4.2: "measured
//! via an injected tokenizer").
//!
//! The serializer never hardcodes a tokenization scheme so a real model
//! tokenizer can be swapped in later without touching ranking/truncation
//! logic.

/// Counts tokens in a piece of text.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Whitespace/punctuation heuristic: splits on non-alphanumeric runs and
/// charges roughly one token per 4 characters for anything left unsplit,
/// which tracks common subword tokenizers closely enough for budgeting
/// purposes without shipping a real BPE table.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let word_tokens = text.split_whitespace().count();
        let char_estimate = (text.chars().count() as f64 / 4.0).ceil() as usize;
        word_tokens.max(char_estimate).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_tokens() {
        assert_eq!(HeuristicTokenizer.count_tokens(""), 0);
    }

    #[test]
    fn longer_text_costs_more_tokens() {
        let short = HeuristicTokenizer.count_tokens("hello world");
        let long = HeuristicTokenizer.count_tokens("hello world this is a much longer sentence");
        assert!(long > short);
    }
}
