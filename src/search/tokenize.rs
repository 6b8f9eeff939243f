//! Text tokenization shared by index loading and query parsing.
//!
//! Term statistics are only meaningful when the corpus and the query are split
//! by the same function, so both sides go through [`tokenize`].

use ahash::AHashMap;

/// Tokens shorter than this are dropped.
pub(crate) const MIN_TOKEN_LENGTH: usize = 2;

/// Lowercases `text`, splits it on every non-alphanumeric character and drops
/// tokens shorter than [`MIN_TOKEN_LENGTH`] characters.
///
/// - "SparkMax current-limit" → ["sparkmax", "current", "limit"]
/// - "a PID controller" → ["pid", "controller"]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LENGTH)
        .map(str::to_lowercase)
        .collect()
}

/// Counts occurrences of each token.
pub(crate) fn term_frequencies(tokens: &[String]) -> AHashMap<String, u32> {
    let mut counts: AHashMap<String, u32> = AHashMap::with_capacity(tokens.len());
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}
