//! End-to-end tests over the extraction, indexing, and caching pipeline,
//! starting from raw HTML files on disk.

use std::sync::Arc;

use crawldex::cache::MultiLayerCache;
use crawldex::config::CacheConfig;
use crawldex::extract::index_corpus;
use crawldex::index::InvertedIndex;
use tempfile::TempDir;

fn pipeline() -> (Arc<InvertedIndex>, std::path::PathBuf, TempDir) {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();

    let config = CacheConfig {
        l2_dir: tmp.path().join("l2"),
        ..CacheConfig::default()
    };
    let cache = Arc::new(MultiLayerCache::new(&config).unwrap());
    let index = Arc::new(InvertedIndex::new(cache));

    (index, corpus, tmp)
}

#[test]
fn html_corpus_is_searchable_after_reindex() {
    let (index, corpus, _tmp) = pipeline();

    std::fs::write(
        corpus.join("rust.html"),
        "<html><body><h1>Rust</h1><p>Systems programming with fearless concurrency.</p></body></html>",
    )
    .unwrap();
    std::fs::write(
        corpus.join("cooking.html"),
        "<html><body><p>Slow cooking a stew takes patience.</p></body></html>",
    )
    .unwrap();
    std::fs::write(
        corpus.join("gardening.html"),
        "<html><body><p>Garden soil needs compost.</p></body></html>",
    )
    .unwrap();

    let indexed = index_corpus(&index, &corpus).unwrap();
    assert_eq!(indexed, 3);
    assert_eq!(index.document_count(), 3);

    let results = index.search("fearless concurrency", 10);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].doc_id, "rust");
}

#[test]
fn any_ingested_token_finds_its_document() {
    let (index, corpus, _tmp) = pipeline();

    std::fs::write(
        corpus.join("doc.html"),
        "<p>zebras gallop across savannas</p>",
    )
    .unwrap();
    std::fs::write(corpus.join("pad1.html"), "<p>unrelated one</p>").unwrap();
    std::fs::write(corpus.join("pad2.html"), "<p>unrelated two</p>").unwrap();

    index_corpus(&index, &corpus).unwrap();

    // Every word of the document, stemmed or not, must surface it.
    for word in ["zebras", "gallop", "across", "savannas"] {
        let results = index.search(word, 1);
        assert!(!results.is_empty(), "no result for {word}");
        assert_eq!(results[0].doc_id, "doc");
    }
}

#[test]
fn repeated_query_hits_the_result_cache() {
    let (index, corpus, _tmp) = pipeline();

    std::fs::write(corpus.join("a.html"), "<p>cached content here</p>").unwrap();
    index_corpus(&index, &corpus).unwrap();

    let first = index.search("cached content", 5);
    let l3_hits = index.cache_stats().l3_hits;

    let second = index.search("cached content", 5);
    assert_eq!(index.cache_stats().l3_hits, l3_hits + 1);

    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].doc_id, second[0].doc_id);
}

#[test]
fn reindexing_the_same_corpus_is_idempotent() {
    let (index, corpus, _tmp) = pipeline();

    std::fs::write(corpus.join("a.html"), "<p>alpha beta</p>").unwrap();
    std::fs::write(corpus.join("b.html"), "<p>beta gamma</p>").unwrap();

    index_corpus(&index, &corpus).unwrap();
    let stats_first = index.stats();

    index_corpus(&index, &corpus).unwrap();
    let stats_second = index.stats();

    assert_eq!(stats_first.total_documents, stats_second.total_documents);
    assert_eq!(stats_first.unique_terms, stats_second.unique_terms);
    assert_eq!(stats_first.total_positions, stats_second.total_positions);
    assert_eq!(
        stats_first.average_doc_length,
        stats_second.average_doc_length
    );
}

#[test]
fn stats_reflect_corpus_and_cache_activity() {
    let (index, corpus, _tmp) = pipeline();

    std::fs::write(corpus.join("a.html"), "<p>one two three</p>").unwrap();
    index_corpus(&index, &corpus).unwrap();

    index.search("two", 10);

    let stats = index.stats();
    assert_eq!(stats.total_documents, 1);
    assert!(stats.unique_terms >= 3);
    assert!(stats.average_doc_length > 0.0);
    // Ingest and the search both touched the cache.
    let cache = &stats.cache;
    assert!(cache.stats.l1_hits + cache.stats.l1_misses > 0);
}
