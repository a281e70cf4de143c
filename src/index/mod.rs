//! Positional inverted index and the search engine layered on top.

mod engine;
mod inverted;

pub use engine::{EnhancedSearchResult, SearchEngine, SearchOptions};
pub use inverted::{DocumentStats, IndexStats, InvertedIndex};
