//! Core types shared by the crawl, index, and cache subsystems.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Unique identifier for an indexed document: hex SHA-256 of the source URL.
pub type DocId = String;

/// Compute the stable document ID for a URL.
pub fn doc_id_for_url(url: &str) -> DocId {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Metadata tracked for every indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub url: String,
    pub title: String,
    /// Token count at ingest time; immutable afterwards.
    pub length: usize,
    pub indexed_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

/// A single ranked search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub url: String,
    pub title: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

/// Search results as stored in the query-result cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSearchResults {
    pub results: Vec<SearchResult>,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub total_docs: usize,
}

/// Derive a display title from a document's source URL.
///
/// This is a placeholder heuristic: with a path present it yields
/// `"<host> - <last segment>"`, with a bare host just the host, and
/// otherwise the URL verbatim. Parsing the page's `<title>` during
/// extraction would be the richer replacement.
pub fn title_from_url(url: &str) -> String {
    if url.is_empty() {
        return "Untitled Document".to_string();
    }

    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() > 2 {
        let host = parts[2];
        if parts.len() > 3 {
            return format!("{} - {}", host, parts[parts.len() - 1]);
        }
        return host.to_string();
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_stable_64_char_hex() {
        let id = doc_id_for_url("https://example.com/page");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(id, doc_id_for_url("https://example.com/page"));
        assert_ne!(id, doc_id_for_url("https://example.com/other"));
    }

    #[test]
    fn title_from_url_with_path() {
        assert_eq!(
            title_from_url("https://example.com/docs/intro"),
            "example.com - intro"
        );
    }

    #[test]
    fn title_from_url_host_only() {
        assert_eq!(title_from_url("https://example.com"), "example.com");
    }

    #[test]
    fn title_from_url_fallbacks() {
        assert_eq!(title_from_url(""), "Untitled Document");
        assert_eq!(title_from_url("not-a-url"), "not-a-url");
    }
}
