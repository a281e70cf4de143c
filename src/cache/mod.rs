//! Multi-layer caching for index lookups and query results.

mod multi;
mod record;

pub use multi::{CacheInfo, CacheStatsSnapshot, HitRates, MultiLayerCache};
pub use record::{CacheRecord, CacheValue};
