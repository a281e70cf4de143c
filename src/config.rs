//! Runtime configuration.
//!
//! Settings come from the environment with defaults suitable for local use:
//! `PORT` for the HTTP front end, `DATA_URL` for the raw HTML corpus
//! directory, and `SEARCH_DEPTH` for the crawl depth bound.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port for the HTTP front end.
    pub port: u16,
    /// Directory holding the raw HTML corpus, one file per unique URL.
    pub data_dir: PathBuf,
    /// Crawl depth bound; workers stop once `depth >= search_depth`.
    pub search_depth: usize,
    /// Multi-layer cache sizing.
    pub cache: CacheConfig,
}

/// Sizing and retention for the three cache tiers.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entries held in the in-memory LRU tier.
    pub l1_max_items: usize,
    pub l1_ttl: Duration,
    /// Directory for the on-disk tier.
    pub l2_dir: PathBuf,
    /// Soft byte budget for the on-disk tier, in megabytes.
    pub l2_max_size_mb: u64,
    pub l2_ttl: Duration,
    pub l3_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_max_items: 1000,
            l1_ttl: Duration::from_secs(30 * 60),
            l2_dir: PathBuf::from("./cache/disk"),
            l2_max_size_mb: 500,
            l2_ttl: Duration::from_secs(24 * 60 * 60),
            l3_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl CacheConfig {
    /// Cache sizing used by the search index: more memory-resident entries,
    /// longer L1 retention, a larger disk budget, and a shorter query-result
    /// TTL than the general defaults.
    pub fn for_index() -> Self {
        Self {
            l1_max_items: 2000,
            l1_ttl: Duration::from_secs(60 * 60),
            l2_max_size_mb: 1000,
            l3_ttl: Duration::from_secs(30 * 60),
            ..Self::default()
        }
    }

    pub fn l2_max_bytes(&self) -> u64 {
        self.l2_max_size_mb * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("./data/webpages"),
            search_depth: 2,
            cache: CacheConfig::for_index(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(data_dir) = std::env::var("DATA_URL") {
            if !data_dir.is_empty() {
                config.data_dir = PathBuf::from(data_dir);
            }
        }
        if let Ok(depth) = std::env::var("SEARCH_DEPTH") {
            if let Ok(depth) = depth.parse() {
                config.search_depth = depth;
            }
        }

        config
    }

    /// Validate all fields, collecting every problem into one error so the
    /// user can fix everything in a single pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.port == 0 {
            errors.push("port must be between 1 and 65535".to_string());
        }
        if self.data_dir.as_os_str().is_empty() {
            errors.push("data_dir must not be empty".to_string());
        }
        if self.cache.l1_max_items == 0 {
            errors.push("l1_max_items must be positive".to_string());
        }
        if self.cache.l2_dir.as_os_str().is_empty() {
            errors.push("l2_dir must not be empty".to_string());
        }
        if self.cache.l2_max_size_mb == 0 {
            errors.push("l2_max_size_mb must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.data_dir, PathBuf::from("./data/webpages"));
        assert_eq!(cfg.search_depth, 2);
    }

    #[test]
    fn index_cache_overrides() {
        let cache = CacheConfig::for_index();
        assert_eq!(cache.l1_max_items, 2000);
        assert_eq!(cache.l1_ttl, Duration::from_secs(3600));
        assert_eq!(cache.l2_max_size_mb, 1000);
        assert_eq!(cache.l3_ttl, Duration::from_secs(1800));
        // Unchanged from the general defaults
        assert_eq!(cache.l2_ttl, Duration::from_secs(86400));
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut cfg = Config::default();
        cfg.port = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("port must be between 1 and 65535"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = Config::default();
        cfg.port = 0;
        cfg.cache.l1_max_items = 0;
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("port must be between 1 and 65535"));
        assert!(msg.contains("l1_max_items must be positive"));
    }

    #[test]
    fn l2_budget_converts_to_bytes() {
        let mut cache = CacheConfig::default();
        cache.l2_max_size_mb = 2;
        assert_eq!(cache.l2_max_bytes(), 2 * 1024 * 1024);
    }
}
