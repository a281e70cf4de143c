//! JSON types for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::cache::CacheInfo;
use crate::index::IndexStats;

/// Query parameters for `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(rename = "search-query")]
    pub query: Option<String>,
    /// Result count; anything unparseable falls back to the default.
    pub k: Option<String>,
}

/// Query parameters for `POST /crawl`.
#[derive(Debug, Deserialize)]
pub struct CrawlParams {
    pub url: Option<String>,
}

/// Status/message envelope for the cache management endpoints.
#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// `GET /health` response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

/// `GET /stats` response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub index: IndexStats,
    pub cache: CacheInfo,
}
