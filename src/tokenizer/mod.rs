//! N-gram tokenization.
//!
//! Both the indexing and the search path run their input through the same
//! tokenizer, so matching stays case-insensitive end to end.

use crate::types::Token;

/// Default n-gram size (trigrams).
pub const DEFAULT_NGRAM_SIZE: usize = 3;

/// Splits text into fixed-size, lower-cased n-grams.
pub trait Tokenizer: Send + Sync {
    /// Tokenize `content` into an ordered sequence of n-grams.
    ///
    /// Empty input produces no tokens. Input shorter than or equal to the
    /// n-gram size produces a single token covering the whole input.
    fn tokenize(&self, content: &str) -> Vec<Token>;

    /// The fixed n-gram size this tokenizer was configured with.
    fn ngram_size(&self) -> usize;
}

/// Overlapping n-gram tokenizer.
#[derive(Debug, Clone)]
pub struct NGramTokenizer {
    ngram_size: usize,
}

impl NGramTokenizer {
    pub fn new(ngram_size: usize) -> Self {
        debug_assert!(ngram_size > 0, "n-gram size must be positive");
        Self { ngram_size }
    }
}

impl Default for NGramTokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_NGRAM_SIZE)
    }
}

impl Tokenizer for NGramTokenizer {
    fn tokenize(&self, content: &str) -> Vec<Token> {
        if content.is_empty() {
            return Vec::new();
        }

        let lowered = content.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.len() <= self.ngram_size {
            return vec![Token::new(lowered)];
        }

        chars
            .windows(self.ngram_size)
            .map(|window| Token::new(window.iter().collect::<String>()))
            .collect()
    }

    fn ngram_size(&self) -> usize {
        self.ngram_size
    }
}
