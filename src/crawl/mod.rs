//! Crawl pipeline: URL normalization, page fetching, and the
//! bounded-depth driver.

mod driver;
mod fetcher;
mod normalizer;

pub use driver::CrawlDriver;
pub use fetcher::{extract_links, FetchError, Fetcher};
pub use normalizer::normalize;
