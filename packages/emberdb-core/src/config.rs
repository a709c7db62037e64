//! Tunables for the keyspace engine.

use std::path::PathBuf;
use std::time::Duration;

/// Memory-bound eviction strategy applied by the background evicter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    #[default]
    NoEviction,
    AllKeysRandom,
    AllKeysLru,
    VolatileRandom,
    VolatileLru,
}

/// How aggressively the log flushes to disk after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    NoFlush,
    #[default]
    EveryWrite,
    EveryNMillis(u64),
}

/// Every tunable named in the operator-facing config table.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub lru_clock_resolution: f64,
    pub aof_path: PathBuf,
    pub sweeper_interval: Duration,
    pub random_remove_factor: f64,
    pub lru_sample_factor: f64,
    pub evicter_interval: Duration,
    pub evicter_policy: EvictionPolicy,
    pub max_seg_size: u64,
    pub max_ziplist_size: u64,
    pub max_intset_length: usize,
    pub flush_policy: FlushPolicy,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "localhost".to_string(),
            port: 8222,
            lru_clock_resolution: 0.01,
            aof_path: PathBuf::from("./data"),
            sweeper_interval: Duration::from_millis(1000),
            random_remove_factor: 0.001,
            lru_sample_factor: 0.001,
            evicter_interval: Duration::from_secs(1000),
            evicter_policy: EvictionPolicy::NoEviction,
            max_seg_size: 20 * 1024 * 1024,
            max_ziplist_size: 256 * 1024,
            max_intset_length: 512,
            flush_policy: FlushPolicy::EveryWrite,
        }
    }
}
