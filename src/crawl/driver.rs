//! Bounded-depth crawl driver.
//!
//! The driver walks the link graph recursively from a seed URL,
//! deduplicating through a per-invocation visited set and bounding
//! parallel fetches with a semaphore. `crawl` returns only once every
//! task it spawned has completed.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::fetcher::Fetcher;

/// Maximum concurrent fetches per crawl.
const MAX_CONCURRENT_FETCHES: usize = 10;

pub struct CrawlDriver {
    fetcher: Arc<Fetcher>,
    max_depth: usize,
}

struct CrawlState {
    fetcher: Arc<Fetcher>,
    max_depth: usize,
    visited: Mutex<HashSet<String>>,
    semaphore: Semaphore,
}

impl CrawlDriver {
    pub fn new(fetcher: Arc<Fetcher>, max_depth: usize) -> Self {
        Self { fetcher, max_depth }
    }

    /// Crawl from a seed URL, returning once the frontier is exhausted.
    pub async fn crawl(&self, seed: &str) {
        info!(seed, max_depth = self.max_depth, "starting crawl");

        let state = Arc::new(CrawlState {
            fetcher: self.fetcher.clone(),
            max_depth: self.max_depth,
            visited: Mutex::new(HashSet::new()),
            semaphore: Semaphore::new(MAX_CONCURRENT_FETCHES),
        });

        worker(state.clone(), seed.to_string(), 0).await;

        let visited = state.visited.lock().len();
        info!(seed, visited, "crawl finished");
    }
}

/// Visit one URL and recurse over its outbound links.
///
/// The visited-set insert happens before any task is spawned, so a URL
/// can never be scheduled twice within a crawl. The semaphore permit
/// covers only the fetch; it is released before waiting on children.
fn worker(state: Arc<CrawlState>, url: String, depth: usize) -> BoxFuture<'static, ()> {
    async move {
        if depth >= state.max_depth {
            return;
        }

        if !state.visited.lock().insert(url.clone()) {
            return;
        }

        let links = {
            let Ok(_permit) = state.semaphore.acquire().await else {
                return;
            };
            match state.fetcher.fetch(&url).await {
                Ok(links) => links,
                Err(err) => {
                    // Per-URL failures never abort the crawl.
                    warn!(url, %err, "fetch failed");
                    return;
                }
            }
        };

        let children: Vec<_> = links
            .into_iter()
            .map(|link| tokio::spawn(worker(state.clone(), link, depth + 1)))
            .collect();
        for child in children {
            if let Err(err) = child.await {
                warn!(%err, "crawl task failed");
            }
        }
    }
    .boxed()
}
