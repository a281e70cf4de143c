//! Text tokenization: unicode-aware lowercasing, punctuation stripping,
//! whitespace splitting, and English Snowball stemming.

use std::collections::HashSet;
use std::sync::OnceLock;

use rust_stemmers::{Algorithm, Stemmer};

fn stemmer() -> &'static Stemmer {
    static STEMMER: OnceLock<Stemmer> = OnceLock::new();
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Tokenize text into an ordered stream of stemmed terms.
///
/// Code points that are neither letters, digits, nor whitespace are dropped
/// without substitution, so `"don't"` becomes `"dont"` rather than two
/// tokens. The output order defines token positions in the index.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| stemmer().stem(word).into_owned())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Distinct tokens from a stream, first occurrence wins.
///
/// Applied to query terms only; document tokens keep their duplicates so
/// positions stay intact.
pub fn dedup_tokens(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
