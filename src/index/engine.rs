//! Search options and result enrichment over the core index.

use std::sync::Arc;

use serde::Serialize;

use crate::tokenizer::{dedup_tokens, tokenize};

use super::inverted::InvertedIndex;

/// Score multiplier applied when a document contains every query term.
const ALL_TERMS_BOOST: f64 = 1.5;

/// Knobs for an enhanced search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    /// Hits scoring below this are dropped before boosting.
    pub min_score: f64,
    /// Multiply the score of documents containing every query term. This
    /// is set containment, not phrase matching.
    pub boost_all_terms: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_score: 0.0,
            boost_all_terms: true,
        }
    }
}

/// A search hit enriched with the query terms that matched it.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancedSearchResult {
    pub doc_id: String,
    pub url: String,
    pub score: f64,
    pub matched_terms: Vec<String>,
}

pub struct SearchEngine {
    index: Arc<InvertedIndex>,
}

impl SearchEngine {
    pub fn new(index: Arc<InvertedIndex>) -> Self {
        Self { index }
    }

    /// Search with score filtering and optional all-terms boosting.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<EnhancedSearchResult> {
        let terms = dedup_tokens(tokenize(query));
        if terms.is_empty() {
            return Vec::new();
        }

        // Over-fetch so post-filtering still fills the requested page.
        let basic = self.index.search(query, options.max_results * 2);

        let mut results: Vec<EnhancedSearchResult> = basic
            .into_iter()
            .filter(|result| result.score >= options.min_score)
            .map(|result| {
                let matched_terms = self.index.matched_terms(&result.doc_id, &terms);
                let mut score = result.score;
                if options.boost_all_terms && self.index.contains_all_terms(&result.doc_id, &terms)
                {
                    score *= ALL_TERMS_BOOST;
                }
                EnhancedSearchResult {
                    doc_id: result.doc_id,
                    url: result.url,
                    score,
                    matched_terms,
                }
            })
            .collect();

        // Boosting can reorder, so sort again before trimming.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(options.max_results);
        results
    }
}
