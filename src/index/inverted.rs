//! Positional inverted index with BM25 ranking.
//!
//! The index maps term -> docID -> positions and keeps the per-document
//! and corpus-wide length accounting BM25 needs. Ingest is idempotent:
//! re-adding a known docID is a no-op. Queries consult the query-result
//! cache first, then enumerate candidates through the term cache, and
//! always score from the live postings.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{CacheInfo, CacheStatsSnapshot, CacheValue, MultiLayerCache};
use crate::tokenizer::{dedup_tokens, tokenize};
use crate::types::{
    title_from_url, CachedSearchResults, DocId, DocumentMetadata, SearchResult,
};

/// BM25 term-frequency saturation parameter.
const BM25_K1: f64 = 1.5;
/// BM25 length-normalization strength.
const BM25_B: f64 = 0.75;
/// Number of high-document-frequency terms loaded by a cache prewarm.
const PREWARM_TERM_COUNT: usize = 500;
/// L1 request volume required before optimize considers clearing.
const OPTIMIZE_MIN_REQUESTS: u64 = 100;
/// L1 hit rate below which optimize clears and re-warms the cache.
const OPTIMIZE_MIN_HIT_RATE: f64 = 0.30;

#[derive(Default)]
struct IndexState {
    /// term -> docID -> strictly increasing token positions.
    postings: HashMap<String, HashMap<DocId, Vec<usize>>>,
    /// docID -> total token count at ingest.
    doc_len: HashMap<DocId, usize>,
    /// term -> number of distinct documents containing it.
    doc_freq: HashMap<String, usize>,
    doc_count: usize,
    sum_doc_len: usize,
    avg_dl: f64,
}

/// Aggregate index statistics, including cache occupancy.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub unique_terms: usize,
    pub total_positions: usize,
    pub average_doc_length: f64,
    pub cache: CacheInfo,
}

/// Statistics for a single indexed document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub length: usize,
    pub unique_terms: usize,
    pub url: Option<String>,
}

pub struct InvertedIndex {
    state: RwLock<IndexState>,
    /// docID -> source URL, populated at fetch time. Separate lock because
    /// fetchers write here while searches read.
    doc_urls: RwLock<HashMap<DocId, String>>,
    /// Separate lock because `last_access` is mutated on read paths.
    doc_meta: RwLock<HashMap<DocId, DocumentMetadata>>,
    cache: Arc<MultiLayerCache>,
}

impl InvertedIndex {
    pub fn new(cache: Arc<MultiLayerCache>) -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            doc_urls: RwLock::new(HashMap::new()),
            doc_meta: RwLock::new(HashMap::new()),
            cache,
        }
    }

    /// Record the source URL for a document. Called by the fetcher at
    /// persist time; the first write wins.
    pub fn record_url(&self, doc_id: &str, url: &str) {
        self.doc_urls
            .write()
            .entry(doc_id.to_string())
            .or_insert_with(|| url.to_string());
    }

    pub fn url_for(&self, doc_id: &str) -> Option<String> {
        self.doc_urls.read().get(doc_id).cloned()
    }

    /// Ingest a document's token stream under an exclusive lock.
    ///
    /// Re-adding a docID that is already indexed (or still present in the
    /// document cache) leaves every structure untouched.
    pub fn add_document(&self, doc_id: &str, tokens: Vec<String>) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let cache_key = format!("doc:{doc_id}");
        if self.cache.get(&cache_key).is_some() {
            debug!(doc_id, "document already cached, skipping");
            return;
        }
        if state.doc_len.contains_key(doc_id) {
            return;
        }

        let token_count = tokens.len();
        state.doc_count += 1;
        state.doc_len.insert(doc_id.to_string(), token_count);

        let mut seen: HashSet<&str> = HashSet::new();
        for (pos, token) in tokens.iter().enumerate() {
            state
                .postings
                .entry(token.clone())
                .or_default()
                .entry(doc_id.to_string())
                .or_default()
                .push(pos);
            if seen.insert(token.as_str()) {
                *state.doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
        }

        state.sum_doc_len += token_count;
        state.avg_dl = state.sum_doc_len as f64 / state.doc_count as f64;

        let url = self.url_for(doc_id).unwrap_or_default();
        let now = Utc::now();
        let metadata = DocumentMetadata {
            url: url.clone(),
            title: title_from_url(&url),
            length: token_count,
            indexed_at: now,
            last_access: now,
        };
        self.doc_meta
            .write()
            .insert(doc_id.to_string(), metadata.clone());

        self.cache
            .set(&cache_key, CacheValue::Document { tokens, metadata });

        info!(doc_id, tokens = token_count, "document indexed");
    }

    /// Remove a document: drop its postings, decrement per-term document
    /// frequencies, and recompute the length accounting.
    pub fn remove_document(&self, doc_id: &str) -> bool {
        {
            let mut guard = self.state.write();
            let state = &mut *guard;

            let Some(len) = state.doc_len.remove(doc_id) else {
                return false;
            };

            let mut dead_terms = Vec::new();
            for (term, docs) in state.postings.iter_mut() {
                if docs.remove(doc_id).is_none() {
                    continue;
                }
                let term_gone = match state.doc_freq.get_mut(term) {
                    Some(freq) => {
                        *freq -= 1;
                        *freq == 0
                    }
                    None => false,
                };
                if term_gone {
                    state.doc_freq.remove(term);
                }
                if docs.is_empty() {
                    dead_terms.push(term.clone());
                }
            }
            for term in dead_terms {
                state.postings.remove(&term);
            }

            state.doc_count -= 1;
            state.sum_doc_len -= len;
            state.avg_dl = if state.doc_count > 0 {
                state.sum_doc_len as f64 / state.doc_count as f64
            } else {
                0.0
            };
        }

        self.doc_meta.write().remove(doc_id);
        self.doc_urls.write().remove(doc_id);
        self.cache.remove(&format!("doc:{doc_id}"));

        info!(doc_id, "document removed from index");
        true
    }

    /// Ranked BM25 search, consulting the query-result cache first.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        if let Some(CacheValue::QueryResults(cached)) = self.cache.get_query_result(query) {
            for result in &cached.results {
                self.touch_document(&result.doc_id);
            }
            debug!(query, results = cached.results.len(), "query served from cache");
            return cached.results;
        }

        let results = self.perform_search(query, top_k);

        let cached = CachedSearchResults {
            results: results.clone(),
            query: query.to_string(),
            timestamp: Utc::now(),
            total_docs: self.document_count(),
        };
        self.cache
            .set_query_result(query, CacheValue::QueryResults(cached));

        debug!(query, results = results.len(), "search completed");
        results
    }

    fn perform_search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let terms = dedup_tokens(tokenize(query));
        if terms.is_empty() {
            return Vec::new();
        }

        let state = self.state.read();

        // Candidate enumeration goes through the term cache; scoring below
        // always reads the live postings.
        let mut candidates: HashSet<DocId> = HashSet::new();
        for term in &terms {
            let cache_key = format!("term:{term}");
            if let Some(CacheValue::TermPostings(postings)) = self.cache.get(&cache_key) {
                candidates.extend(postings.keys().cloned());
                continue;
            }
            let Some(postings) = state.postings.get(term) else {
                continue;
            };
            self.cache
                .set(&cache_key, CacheValue::TermPostings(postings.clone()));
            candidates.extend(postings.keys().cloned());
        }

        let mut scores: HashMap<DocId, f64> = HashMap::new();
        let n = state.doc_count as f64;

        for term in &terms {
            let df = state.doc_freq.get(term).copied().unwrap_or(0) as f64;
            if df == 0.0 {
                continue;
            }
            // Textbook BM25 IDF; goes negative for very common terms and is
            // deliberately not clamped.
            let idf = ((n - df + 0.5) / (df + 0.5)).ln();

            let Some(postings) = state.postings.get(term) else {
                continue;
            };

            for doc_id in &candidates {
                let tf = postings.get(doc_id).map_or(0, Vec::len) as f64;
                if tf == 0.0 {
                    continue;
                }
                let dl = state.doc_len.get(doc_id).copied().unwrap_or(0) as f64;
                let norm = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * (dl / state.avg_dl));
                *scores.entry(doc_id.clone()).or_insert(0.0) +=
                    idf * (tf * (BM25_K1 + 1.0)) / norm;
            }
        }

        let mut results: Vec<SearchResult> = scores
            .into_iter()
            .map(|(doc_id, score)| {
                let metadata = self.metadata_for(&doc_id, &state);
                self.touch_document(&doc_id);
                SearchResult {
                    url: metadata.url.clone(),
                    title: metadata.title.clone(),
                    score,
                    metadata: Some(metadata),
                    doc_id,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        results
    }

    fn metadata_for(&self, doc_id: &str, state: &IndexState) -> DocumentMetadata {
        if let Some(metadata) = self.doc_meta.read().get(doc_id) {
            return metadata.clone();
        }

        // Fallback for documents indexed before their URL was recorded.
        let url = self.url_for(doc_id).unwrap_or_default();
        let now = Utc::now();
        DocumentMetadata {
            title: title_from_url(&url),
            url,
            length: state.doc_len.get(doc_id).copied().unwrap_or(0),
            indexed_at: now,
            last_access: now,
        }
    }

    fn touch_document(&self, doc_id: &str) {
        if let Some(metadata) = self.doc_meta.write().get_mut(doc_id) {
            metadata.last_access = Utc::now();
        }
    }

    /// Terms from `terms` that occur in the given document.
    pub fn matched_terms(&self, doc_id: &str, terms: &[String]) -> Vec<String> {
        let state = self.state.read();
        terms
            .iter()
            .filter(|term| {
                state
                    .postings
                    .get(*term)
                    .map_or(false, |docs| docs.contains_key(doc_id))
            })
            .cloned()
            .collect()
    }

    /// True when every one of several terms occurs in the document. A
    /// set-containment check, not positional adjacency; used for the
    /// all-terms-present score boost.
    pub fn contains_all_terms(&self, doc_id: &str, terms: &[String]) -> bool {
        if terms.len() <= 1 {
            return false;
        }
        let state = self.state.read();
        terms.iter().all(|term| {
            state
                .postings
                .get(term)
                .map_or(false, |docs| docs.contains_key(doc_id))
        })
    }

    /// Indexed terms starting with `prefix`, most frequent first.
    /// Prefixes shorter than two characters yield nothing.
    pub fn suggest(&self, prefix: &str, max_n: usize) -> Vec<String> {
        let max_n = if max_n == 0 { 5 } else { max_n };
        let prefix = prefix.trim().to_lowercase();
        if prefix.len() < 2 {
            return Vec::new();
        }

        let state = self.state.read();
        let mut suggestions: Vec<String> = state
            .postings
            .keys()
            .filter(|term| term.starts_with(&prefix) && term.as_str() != prefix)
            .cloned()
            .collect();

        suggestions.sort_by(|a, b| {
            let freq_a = state.doc_freq.get(a).copied().unwrap_or(0);
            let freq_b = state.doc_freq.get(b).copied().unwrap_or(0);
            freq_b.cmp(&freq_a)
        });
        suggestions.truncate(max_n);
        suggestions
    }

    /// Statistics for one document, if indexed.
    pub fn document_stats(&self, doc_id: &str) -> Option<DocumentStats> {
        let state = self.state.read();
        let length = *state.doc_len.get(doc_id)?;
        let unique_terms = state
            .postings
            .values()
            .filter(|docs| docs.contains_key(doc_id))
            .count();
        Some(DocumentStats {
            length,
            unique_terms,
            url: self.url_for(doc_id),
        })
    }

    pub fn document_count(&self) -> usize {
        self.state.read().doc_count
    }

    /// Load postings for the highest-document-frequency terms into the
    /// cache ahead of query traffic.
    pub fn prewarm_cache(&self) {
        let state = self.state.read();
        info!("prewarming cache with frequent terms");

        let mut by_freq: Vec<(&String, usize)> = state
            .postings
            .iter()
            .map(|(term, docs)| (term, docs.len()))
            .collect();
        by_freq.sort_by(|a, b| b.1.cmp(&a.1));

        let limit = by_freq.len().min(PREWARM_TERM_COUNT);
        for (term, _) in &by_freq[..limit] {
            if let Some(postings) = state.postings.get(*term) {
                self.cache.set(
                    &format!("term:{term}"),
                    CacheValue::TermPostings(postings.clone()),
                );
            }
        }

        info!(terms = limit, "cache prewarmed");
    }

    /// Clear and re-warm the cache when the L1 hit rate is poor.
    pub fn optimize_cache(&self) {
        let stats = self.cache.stats();
        let total = stats.l1_hits + stats.l1_misses;
        if total < OPTIMIZE_MIN_REQUESTS {
            return;
        }
        let hit_rate = stats.l1_hits as f64 / total as f64;
        if hit_rate < OPTIMIZE_MIN_HIT_RATE {
            info!(hit_rate, "low L1 hit rate, clearing cache for optimization");
            self.cache.clear();
            self.prewarm_cache();
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.cache.info()
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        let total_positions = state
            .postings
            .values()
            .flat_map(|docs| docs.values())
            .map(Vec::len)
            .sum();

        IndexStats {
            total_documents: state.doc_count,
            unique_terms: state.postings.len(),
            total_positions,
            average_doc_length: state.avg_dl,
            cache: self.cache.info(),
        }
    }
}
