//! Page fetching and persistence.
//!
//! A fetched page is written to `<data_dir>/<docID>.html`, its path is
//! queued on the index channel for text extraction, and its outbound
//! links are returned to the crawl driver. The channel send blocks when
//! extraction lags, which is what throttles the crawl.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use scraper::{Html, Selector};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::index::InvertedIndex;
use crate::types::doc_id_for_url;

use super::normalizer::normalize;

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index channel closed")]
    ChannelClosed,
}

pub struct Fetcher {
    client: reqwest::Client,
    data_dir: PathBuf,
    index: Arc<InvertedIndex>,
    index_tx: mpsc::Sender<PathBuf>,
}

impl Fetcher {
    pub fn new(
        client: reqwest::Client,
        data_dir: PathBuf,
        index: Arc<InvertedIndex>,
        index_tx: mpsc::Sender<PathBuf>,
    ) -> Self {
        Self {
            client,
            data_dir,
            index,
            index_tx,
        }
    }

    /// Fetch one page, persist it, queue it for indexing, and return the
    /// set of normalized outbound links.
    pub async fn fetch(&self, url: &str) -> Result<HashSet<String>, FetchError> {
        debug!(url, "fetching");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(url, %status, "non-OK response");
            return Err(FetchError::Status(status));
        }
        let body = response.bytes().await?;

        self.persist(url, &body).await?;

        Ok(extract_links(&body, url))
    }

    async fn persist(&self, url: &str, body: &[u8]) -> Result<(), FetchError> {
        let doc_id = doc_id_for_url(url);

        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.data_dir.join(format!("{doc_id}.html"));
        tokio::fs::write(&path, body).await?;
        info!(doc_id, url, "stored page");

        self.index.record_url(&doc_id, url);

        self.index_tx
            .send(path)
            .await
            .map_err(|_| FetchError::ChannelClosed)
    }
}

/// Extract and normalize every anchor href in a page.
pub fn extract_links(body: &[u8], base_url: &str) -> HashSet<String> {
    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);

    let Ok(selector) = Selector::parse("a[href]") else {
        return HashSet::new();
    };

    let mut links = HashSet::new();
    for element in document.select(&selector) {
        if let Some(href) = element.value().attr("href") {
            if let Some(normalized) = normalize(href, base_url) {
                links.insert(normalized);
            }
        }
    }
    links
}
