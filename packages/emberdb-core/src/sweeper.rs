//! Background reaping and eviction tasks.
//!
//! Both tasks wait a random `[500ms, 1000ms]` delay after startup before
//! their first tick, so a fleet of freshly-opened databases doesn't sweep
//! or evict in lockstep.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::EvictionPolicy;
use crate::db::Database;

async fn startup_jitter() {
    let delay_ms = rand::rng().random_range(500..=1000);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

pub fn spawn_sweeper(db: Arc<Database>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        startup_jitter().await;
        let mut ticker = tokio::time::interval(db.config().sweeper_interval);
        loop {
            ticker.tick().await;
            let span = tracing::debug_span!("sweep");
            let _enter = span.enter();
            let removed = db.sweep_expired();
            if removed > 0 {
                tracing::debug!(removed, "expired keys reaped");
            }
        }
    })
}

pub fn spawn_evicter(db: Arc<Database>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        startup_jitter().await;
        let mut ticker = tokio::time::interval(db.config().evicter_interval);
        loop {
            ticker.tick().await;
            if db.config().evicter_policy == EvictionPolicy::NoEviction {
                continue;
            }
            let span = tracing::debug_span!("evict");
            let _enter = span.enter();
            let removed = match db.config().evicter_policy {
                EvictionPolicy::NoEviction => 0,
                EvictionPolicy::AllKeysRandom => db.evict_all_keys_random(),
                EvictionPolicy::AllKeysLru => db.evict_all_keys_lru(),
                EvictionPolicy::VolatileRandom => db.evict_volatile_random(),
                EvictionPolicy::VolatileLru => db.evict_volatile_lru(),
            };
            if removed > 0 {
                tracing::debug!(removed, "keys evicted");
            }
        }
    })
}
