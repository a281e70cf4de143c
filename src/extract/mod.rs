//! Text-extraction worker pool.
//!
//! Consumes stored-page paths from the index channel, extracts visible
//! text, tokenizes it, and feeds the inverted index. Work in flight
//! drains fully before shutdown completes.

mod text;

pub use text::extract_text;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::index::InvertedIndex;
use crate::tokenizer::tokenize;

/// Maximum concurrent extraction tasks.
const MAX_CONCURRENT_EXTRACTIONS: usize = 5;

pub struct ExtractorPool {
    index: Arc<InvertedIndex>,
}

impl ExtractorPool {
    pub fn new(index: Arc<InvertedIndex>) -> Self {
        Self { index }
    }

    /// Run the pool until the channel closes or shutdown fires, then
    /// drain whatever is still in flight.
    pub async fn run(
        self,
        mut paths: mpsc::Receiver<PathBuf>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_EXTRACTIONS));
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                maybe_path = paths.recv() => {
                    let Some(path) = maybe_path else { break };
                    let index = self.index.clone();
                    let semaphore = semaphore.clone();
                    tasks.spawn(async move {
                        let Ok(_permit) = semaphore.acquire_owned().await else {
                            return;
                        };
                        extract_and_index(&index, &path);
                    });
                    // Reap whatever has already finished so the set does
                    // not grow with the corpus.
                    while tasks.try_join_next().is_some() {}
                }
                _ = shutdown.recv() => {
                    info!("extractor pool stopping");
                    break;
                }
            }
        }

        while tasks.join_next().await.is_some() {}
        info!("extractor pool drained");
    }
}

fn extract_and_index(index: &InvertedIndex, path: &Path) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read stored page");
            return;
        }
    };

    let text = extract_text(&String::from_utf8_lossy(&bytes));
    if text.is_empty() {
        debug!(path = %path.display(), "no visible text");
        return;
    }

    let tokens = tokenize(&text);
    if tokens.is_empty() {
        return;
    }

    let Some(doc_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
        warn!(path = %path.display(), "unexpected corpus file name");
        return;
    };

    index.add_document(doc_id, tokens);
}

/// Rebuild the index from a stored HTML corpus directory.
///
/// The on-disk corpus is the system of record; the in-memory index is
/// rebuilt from it for one-shot queries and after restarts.
pub fn index_corpus(index: &InvertedIndex, data_dir: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(data_dir)
        .with_context(|| format!("reading corpus directory {}", data_dir.display()))?;

    let mut indexed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "html") {
            continue;
        }
        extract_and_index(index, &path);
        indexed += 1;
    }
    Ok(indexed)
}
