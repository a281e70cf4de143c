//! Process wiring: component construction, the HTTP front end, and
//! graceful shutdown.

mod handlers;
mod routes;
mod types;

pub use routes::create_router;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::cache::MultiLayerCache;
use crate::config::Config;
use crate::crawl::{CrawlDriver, Fetcher};
use crate::extract::ExtractorPool;
use crate::index::InvertedIndex;

/// Index channel capacity; fetchers block here when extraction lags.
const INDEX_CHANNEL_CAPACITY: usize = 100;
/// Interval between cache expiry sweeps.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// Budget for draining in-flight work at shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<InvertedIndex>,
    pub driver: Arc<CrawlDriver>,
}

/// The assembled search service.
///
/// Every component is constructed here and passed down explicitly, so
/// initialization order is deterministic and nothing lives in globals.
pub struct Daemon {
    config: Config,
    cache: Arc<MultiLayerCache>,
    index: Arc<InvertedIndex>,
    driver: Arc<CrawlDriver>,
    pool: ExtractorPool,
    index_tx: mpsc::Sender<PathBuf>,
    index_rx: mpsc::Receiver<PathBuf>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
    /// Construct every component in dependency order.
    pub fn new(config: Config) -> Result<Self> {
        let cache = Arc::new(MultiLayerCache::new(&config.cache)?);
        let index = Arc::new(InvertedIndex::new(cache.clone()));

        let (index_tx, index_rx) = mpsc::channel(INDEX_CHANNEL_CAPACITY);

        let client = reqwest::Client::builder()
            .user_agent(concat!("crawldex/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .context("building HTTP client")?;

        let fetcher = Arc::new(Fetcher::new(
            client,
            config.data_dir.clone(),
            index.clone(),
            index_tx.clone(),
        ));
        let driver = Arc::new(CrawlDriver::new(fetcher, config.search_depth));
        let pool = ExtractorPool::new(index.clone());

        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            cache,
            index,
            driver,
            pool,
            index_tx,
            index_rx,
            shutdown_tx,
        })
    }

    pub fn index(&self) -> Arc<InvertedIndex> {
        self.index.clone()
    }

    /// Serve HTTP until a shutdown signal arrives, then drain within the
    /// shutdown budget.
    pub async fn run(self) -> Result<()> {
        let Daemon {
            config,
            cache,
            index,
            driver,
            pool,
            index_tx,
            index_rx,
            shutdown_tx,
        } = self;

        let pool_handle = tokio::spawn(pool.run(index_rx, shutdown_tx.subscribe()));

        // Periodic cache expiry sweep.
        let mut sweeper_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; skip it.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => cache.cleanup(),
                    _ = sweeper_shutdown.recv() => break,
                }
            }
        });

        let state = AppState {
            index,
            driver,
        };
        let app = routes::create_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        info!(%addr, "server listening");

        let mut server_shutdown = shutdown_tx.subscribe();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = server_shutdown.recv().await;
            info!("http server shutting down");
        });
        let server_handle = tokio::spawn(async move {
            if let Err(err) = server.await {
                error!(%err, "http server error");
            }
        });

        shutdown_signal().await;
        info!("shutdown signal received, draining");

        let _ = shutdown_tx.send(());
        // Closing our end of the index channel; the extractor stops
        // accepting paths and finishes what it already has.
        drop(index_tx);

        let drain = async {
            let _ = server_handle.await;
            let _ = pool_handle.await;
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
            warn!("graceful shutdown timed out");
        }

        info!("server stopped");
        Ok(())
    }

    /// Crawl a single seed to completion, drain extraction, and return.
    /// Used by the one-shot CLI command.
    pub async fn crawl_once(self, seed: &str) -> Result<()> {
        let Daemon {
            index,
            driver,
            pool,
            index_tx,
            index_rx,
            shutdown_tx,
            ..
        } = self;

        let pool_handle = tokio::spawn(pool.run(index_rx, shutdown_tx.subscribe()));

        driver.crawl(seed).await;

        // Dropping every sender closes the channel; the pool drains the
        // backlog and exits.
        drop(driver);
        drop(index_tx);
        let _ = pool_handle.await;

        info!(documents = index.document_count(), "crawl complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
