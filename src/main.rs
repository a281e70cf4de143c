//! crawldex command line interface.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crawldex::cache::MultiLayerCache;
use crawldex::config::Config;
use crawldex::extract;
use crawldex::index::{InvertedIndex, SearchEngine, SearchOptions};
use crawldex::server::Daemon;

#[derive(Parser)]
#[command(name = "crawldex")]
#[command(about = "Local search engine with a positional BM25 index and multi-layer caching")]
#[command(version)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,

    /// Crawl a seed URL, index the pages, then exit
    Crawl {
        /// Seed URL
        url: String,

        /// Maximum crawl depth
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Query a previously stored corpus
    Search {
        /// Search query
        query: String,

        /// Number of results
        #[arg(short, long, default_value = "10")]
        top_k: usize,

        /// Drop results scoring below this
        #[arg(long, default_value = "0.0")]
        min_score: f64,

        /// Disable the all-terms-present score boost
        #[arg(long)]
        no_boost: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::from_env();

    match cli.command {
        Commands::Serve => {
            config.validate()?;
            let daemon = Daemon::new(config)?;
            daemon.run().await
        }
        Commands::Crawl { url, depth } => {
            if let Some(depth) = depth {
                config.search_depth = depth;
            }
            config.validate()?;
            let daemon = Daemon::new(config)?;
            daemon.crawl_once(&url).await
        }
        Commands::Search {
            query,
            top_k,
            min_score,
            no_boost,
        } => {
            config.validate()?;
            search_corpus(config, query, top_k, min_score, no_boost)
        }
    }
}

/// Rebuild the index from the stored corpus and run one query.
fn search_corpus(
    config: Config,
    query: String,
    top_k: usize,
    min_score: f64,
    no_boost: bool,
) -> Result<()> {
    let cache = Arc::new(MultiLayerCache::new(&config.cache)?);
    let index = Arc::new(InvertedIndex::new(cache));

    let indexed = extract::index_corpus(&index, &config.data_dir)?;
    info!(documents = indexed, "corpus reindexed");

    let engine = SearchEngine::new(index);
    let results = engine.search(
        &query,
        &SearchOptions {
            max_results: top_k,
            min_score,
            boost_all_terms: !no_boost,
        },
    );

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
