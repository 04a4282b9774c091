use std::collections::BTreeSet;

/// Characters trimmed from both edges of every whitespace-separated token
pub const TRIM_CHARS: &[char] = &[',', '.', '!', '?', ' ', '\t', '\n', '\r'];

/// Text normalizer shared by indexing, de-indexing and querying.
///
/// Lowercases, splits on whitespace and trims [`TRIM_CHARS`] from each token
/// edge. Tokens that end up empty are discarded. De-indexing relies on this
/// producing exactly the term set the document was indexed with.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tokenizer;

impl Tokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Tokenize text into terms, preserving order and repetitions
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(|word| word.trim_matches(TRIM_CHARS))
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Distinct terms of a text; the index is presence-only
    pub fn unique_terms(&self, text: &str) -> BTreeSet<String> {
        self.tokenize(text).into_iter().collect()
    }
}
