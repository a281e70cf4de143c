//! Three-tier cache: in-memory LRU (L1), on-disk JSON spill (L2), and a
//! query-result map (L3).
//!
//! All tiers share one hashed key space. Lookups walk L1, L2, L3 in order
//! and promote hits upward: an L2 hit is re-written to L1, an L3 hit to
//! both L1 and L2. L1 is bounded by entry count, L2 by a byte budget with
//! oldest-mtime-first eviction. A periodic sweep drops expired entries.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::CacheConfig;

use super::record::{CacheRecord, CacheValue};

/// Per-tier hit/miss counters plus the shared eviction count.
#[derive(Debug, Default)]
pub struct CacheStats {
    l1_hits: AtomicU64,
    l1_misses: AtomicU64,
    l2_hits: AtomicU64,
    l2_misses: AtomicU64,
    l3_hits: AtomicU64,
    l3_misses: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time view of the counters, for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSnapshot {
    pub l1_hits: u64,
    pub l1_misses: u64,
    pub l2_hits: u64,
    pub l2_misses: u64,
    pub l3_hits: u64,
    pub l3_misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l1_misses: self.l1_misses.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            l2_misses: self.l2_misses.load(Ordering::Relaxed),
            l3_hits: self.l3_hits.load(Ordering::Relaxed),
            l3_misses: self.l3_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Per-tier hit rates. The denominators add one so a tier with no traffic
/// reports 0 instead of dividing by zero.
#[derive(Debug, Clone, Serialize)]
pub struct HitRates {
    pub l1: f64,
    pub l2: f64,
    pub l3: f64,
}

/// Tier occupancy and performance, for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub l1_items: usize,
    pub l1_max_items: usize,
    pub l2_size_bytes: u64,
    pub l2_max_bytes: u64,
    pub l3_items: usize,
    pub stats: CacheStatsSnapshot,
    pub hit_rates: HitRates,
}

pub struct MultiLayerCache {
    l1: Mutex<LruCache<String, CacheRecord>>,
    l1_max_items: usize,
    l1_ttl: Duration,

    l2_dir: PathBuf,
    l2_ttl: Duration,
    l2_max_bytes: u64,
    l2_current_bytes: AtomicI64,
    l2_lock: RwLock<()>,

    l3: RwLock<HashMap<String, CacheRecord>>,
    l3_ttl: Duration,

    stats: CacheStats,
}

impl MultiLayerCache {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.l2_dir).with_context(|| {
            format!("creating L2 cache directory {}", config.l2_dir.display())
        })?;

        let capacity =
            NonZeroUsize::new(config.l1_max_items).unwrap_or(NonZeroUsize::MIN);

        let cache = Self {
            l1: Mutex::new(LruCache::new(capacity)),
            l1_max_items: config.l1_max_items,
            l1_ttl: config.l1_ttl,
            l2_dir: config.l2_dir.clone(),
            l2_ttl: config.l2_ttl,
            l2_max_bytes: config.l2_max_bytes(),
            l2_current_bytes: AtomicI64::new(0),
            l2_lock: RwLock::new(()),
            l3: RwLock::new(HashMap::new()),
            l3_ttl: config.l3_ttl,
            stats: CacheStats::default(),
        };

        cache.recalculate_l2_size();

        info!(
            l1_max_items = config.l1_max_items,
            l2_dir = %config.l2_dir.display(),
            l2_max_mb = config.l2_max_size_mb,
            "multi-layer cache initialized"
        );

        Ok(cache)
    }

    /// Consistent hashed key shared by all tiers: the first 16 bytes of
    /// the key's SHA-256, hex encoded.
    fn hash_key(key: &str) -> String {
        let digest = Sha256::digest(key.as_bytes());
        hex::encode(&digest[..16])
    }

    /// Look a key up across all tiers, promoting hits upward.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        let hash = Self::hash_key(key);

        if let Some(value) = self.get_from_l1(&hash) {
            self.stats.l1_hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }
        self.stats.l1_misses.fetch_add(1, Ordering::Relaxed);

        if let Some(value) = self.get_from_l2(&hash) {
            self.stats.l2_hits.fetch_add(1, Ordering::Relaxed);
            self.set_to_l1(&hash, value.clone());
            return Some(value);
        }
        self.stats.l2_misses.fetch_add(1, Ordering::Relaxed);

        if let Some(value) = self.get_from_l3(&hash) {
            self.stats.l3_hits.fetch_add(1, Ordering::Relaxed);
            self.set_to_l1(&hash, value.clone());
            if let Err(err) = self.set_to_l2(&hash, value.clone()) {
                warn!(%err, "failed to spill promoted entry to L2");
            }
            return Some(value);
        }
        self.stats.l3_misses.fetch_add(1, Ordering::Relaxed);

        None
    }

    /// Store a value in the L1 and L2 tiers.
    pub fn set(&self, key: &str, value: CacheValue) {
        let hash = Self::hash_key(key);
        self.set_to_l1(&hash, value.clone());
        if let Err(err) = self.set_to_l2(&hash, value) {
            warn!(%err, "failed to write L2 cache entry");
        }
    }

    /// Remove a key from every tier.
    pub fn remove(&self, key: &str) {
        let hash = Self::hash_key(key);

        self.l1.lock().pop(&hash);

        {
            let _guard = self.l2_lock.write();
            let path = self.l2_path(&hash);
            if let Ok(meta) = std::fs::metadata(&path) {
                if std::fs::remove_file(&path).is_ok() {
                    self.l2_current_bytes
                        .fetch_sub(meta.len() as i64, Ordering::Relaxed);
                }
            }
        }

        self.l3.write().remove(&hash);
    }

    /// Store ranked results for a query in the L3 tier.
    ///
    /// L3 is the only tier written here; the first repeat lookup registers
    /// as an L3 hit and promotion takes it from there.
    pub fn set_query_result(&self, query: &str, results: CacheValue) {
        let hash = Self::hash_key(&format!("query:{query}"));
        self.set_to_l3(&hash, results);
    }

    /// Retrieve cached results for a query, checking all tiers.
    pub fn get_query_result(&self, query: &str) -> Option<CacheValue> {
        self.get(&format!("query:{query}"))
    }

    // L1: in-memory LRU.

    fn get_from_l1(&self, hash: &str) -> Option<CacheValue> {
        let mut l1 = self.l1.lock();
        let expired = match l1.get_mut(hash) {
            Some(record) if !record.is_expired() => {
                record.touch();
                return Some(record.data.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            l1.pop(hash);
        }
        None
    }

    fn set_to_l1(&self, hash: &str, value: CacheValue) {
        let record = CacheRecord::new(value, self.l1_ttl);
        let mut l1 = self.l1.lock();
        if let Some((evicted_key, _)) = l1.push(hash.to_string(), record) {
            // push returns the displaced pair: the old value when the key
            // already existed, or the LRU entry when at capacity.
            if evicted_key != hash {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // L2: on-disk JSON records, one file per key.

    fn l2_path(&self, hash: &str) -> PathBuf {
        self.l2_dir.join(format!("{hash}.cache"))
    }

    fn get_from_l2(&self, hash: &str) -> Option<CacheValue> {
        let _guard = self.l2_lock.read();

        let path = self.l2_path(hash);
        let bytes = std::fs::read(&path).ok()?;

        let mut record: CacheRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %path.display(), %err, "unreadable L2 cache entry");
                return None;
            }
        };

        if record.is_expired() {
            let _ = std::fs::remove_file(&path);
            return None;
        }

        record.touch();
        let data = record.data.clone();

        // Access-time write-back happens off the caller's path.
        std::thread::spawn(move || {
            if let Ok(bytes) = serde_json::to_vec(&record) {
                let _ = std::fs::write(&path, bytes);
            }
        });

        Some(data)
    }

    fn set_to_l2(&self, hash: &str, value: CacheValue) -> Result<()> {
        let _guard = self.l2_lock.write();

        let record = CacheRecord::new(value, self.l2_ttl);
        let bytes = serde_json::to_vec(&record).context("serializing L2 cache record")?;

        self.evict_l2_until_fits(bytes.len() as i64);

        let path = self.l2_path(hash);
        std::fs::write(&path, &bytes)
            .with_context(|| format!("writing L2 cache file {}", path.display()))?;
        self.l2_current_bytes
            .fetch_add(bytes.len() as i64, Ordering::Relaxed);
        Ok(())
    }

    /// Evict oldest-mtime-first until the incoming entry fits the budget.
    fn evict_l2_until_fits(&self, incoming: i64) {
        let current = self.l2_current_bytes.load(Ordering::Relaxed);
        let max = self.l2_max_bytes as i64;
        if current + incoming <= max {
            return;
        }

        let mut files = self.l2_files();
        files.sort_by_key(|(_, mtime, _)| *mtime);

        let mut space_needed = (current + incoming) - max;
        for (path, _, size) in files {
            if space_needed <= 0 {
                break;
            }
            if std::fs::remove_file(&path).is_ok() {
                self.l2_current_bytes.fetch_sub(size, Ordering::Relaxed);
                space_needed -= size;
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn l2_files(&self) -> Vec<(PathBuf, SystemTime, i64)> {
        let mut files = Vec::new();
        let Ok(entries) = std::fs::read_dir(&self.l2_dir) else {
            return files;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "cache") {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                files.push((path, mtime, meta.len() as i64));
            }
        }
        files
    }

    fn recalculate_l2_size(&self) {
        let total: i64 = self.l2_files().iter().map(|(_, _, size)| size).sum();
        self.l2_current_bytes.store(total, Ordering::Relaxed);
    }

    // L3: query results.

    fn get_from_l3(&self, hash: &str) -> Option<CacheValue> {
        let mut l3 = self.l3.write();
        let expired = match l3.get_mut(hash) {
            Some(record) if !record.is_expired() => {
                record.touch();
                return Some(record.data.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            l3.remove(hash);
        }
        None
    }

    fn set_to_l3(&self, hash: &str, value: CacheValue) {
        let record = CacheRecord::new(value, self.l3_ttl);
        self.l3.write().insert(hash.to_string(), record);
    }

    /// Drop expired entries from every tier. Called by the background
    /// sweeper every few minutes.
    pub fn cleanup(&self) {
        {
            let mut l1 = self.l1.lock();
            let expired: Vec<String> = l1
                .iter()
                .filter(|(_, record)| record.is_expired())
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                l1.pop(&key);
            }
        }

        {
            let _guard = self.l2_lock.write();
            let now = SystemTime::now();
            for (path, mtime, size) in self.l2_files() {
                let stale = now
                    .duration_since(mtime)
                    .map_or(false, |age| age > self.l2_ttl);
                if stale && std::fs::remove_file(&path).is_ok() {
                    self.l2_current_bytes.fetch_sub(size, Ordering::Relaxed);
                }
            }
        }

        self.l3.write().retain(|_, record| !record.is_expired());
    }

    /// Empty every tier. Stats accumulators are preserved.
    pub fn clear(&self) {
        self.l1.lock().clear();

        {
            let _guard = self.l2_lock.write();
            for (path, _, _) in self.l2_files() {
                let _ = std::fs::remove_file(&path);
            }
            self.l2_current_bytes.store(0, Ordering::Relaxed);
        }

        self.l3.write().clear();

        info!("all cache layers cleared");
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Tier occupancy and hit rates.
    pub fn info(&self) -> CacheInfo {
        let l1_items = self.l1.lock().len();
        let l3_items = self.l3.read().len();
        let stats = self.stats.snapshot();

        let rate = |hits: u64, misses: u64| hits as f64 / (hits + misses + 1) as f64;

        CacheInfo {
            l1_items,
            l1_max_items: self.l1_max_items,
            l2_size_bytes: self.l2_current_bytes.load(Ordering::Relaxed).max(0) as u64,
            l2_max_bytes: self.l2_max_bytes,
            l3_items,
            hit_rates: HitRates {
                l1: rate(stats.l1_hits, stats.l1_misses),
                l2: rate(stats.l2_hits, stats.l2_misses),
                l3: rate(stats.l3_hits, stats.l3_misses),
            },
            stats,
        }
    }
}
