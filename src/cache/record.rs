//! Cache record and payload types.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CachedSearchResults, DocumentMetadata};

/// Payload carried by a cache record.
///
/// The serde tag makes the serialized on-disk format self-describing, so
/// the L2 tier can round-trip heterogenous payloads without guessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    /// Postings for a single term: docID to positions.
    TermPostings(HashMap<String, Vec<usize>>),
    /// Ranked results for a query.
    QueryResults(CachedSearchResults),
    /// An ingested document: its token stream plus metadata.
    Document {
        tokens: Vec<String>,
        metadata: DocumentMetadata,
    },
}

/// A cached entry with expiry and access bookkeeping.
///
/// The same record shape is used in every tier; the L2 tier serializes it
/// to JSON verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub data: CacheValue,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub hit_count: i64,
}

impl CacheRecord {
    pub fn new(data: CacheValue, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            data,
            expires_at: now + chrono::Duration::seconds(ttl.as_secs() as i64),
            created_at: now,
            accessed_at: now,
            hit_count: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Update the access time and increment the hit count.
    pub fn touch(&mut self) {
        self.accessed_at = Utc::now();
        self.hit_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term_payload() -> CacheValue {
        let mut postings = HashMap::new();
        postings.insert("doc-a".to_string(), vec![0, 4, 9]);
        CacheValue::TermPostings(postings)
    }

    #[test]
    fn fresh_record_is_not_expired() {
        let record = CacheRecord::new(term_payload(), Duration::from_secs(60));
        assert!(!record.is_expired());
    }

    #[test]
    fn zero_ttl_record_expires() {
        let record = CacheRecord::new(term_payload(), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert!(record.is_expired());
    }

    #[test]
    fn touch_updates_access_bookkeeping() {
        let mut record = CacheRecord::new(term_payload(), Duration::from_secs(60));
        let before = record.accessed_at;
        std::thread::sleep(Duration::from_millis(5));
        record.touch();
        assert!(record.accessed_at > before);
        assert_eq!(record.hit_count, 1);
    }

    #[test]
    fn record_round_trips_through_json_with_tag() {
        let record = CacheRecord::new(term_payload(), Duration::from_secs(60));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"kind\":\"term_postings\""));
        assert!(json.contains("\"expires_at\""));
        assert!(json.contains("\"hit_count\""));

        let decoded: CacheRecord = serde_json::from_str(&json).unwrap();
        match decoded.data {
            CacheValue::TermPostings(postings) => {
                assert_eq!(postings["doc-a"], vec![0, 4, 9]);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
