//! Key dictionary: name -> value-kind entity, LRU-tick aware.

use dashmap::DashMap;
use parking_lot::RwLock;
use rand::seq::IteratorRandom;

use crate::clock::LruClock;
use crate::ttl::TtlStore;
use crate::value::Value;

pub struct KeyEntity {
    pub value: Value,
    pub lru_tick: f64,
}

/// Wraps the key map behind a single `RwLock` so that even a read-path
/// lookup (`find`) can refresh LRU bookkeeping under a write lock, the
/// same trade-off the source dictionary makes.
pub struct Dict {
    entries: RwLock<DashMap<String, KeyEntity>>,
    clock: LruClock,
}

impl Dict {
    pub fn new(clock: LruClock) -> Self {
        Dict { entries: RwLock::new(DashMap::new()), clock }
    }

    pub fn add(&self, key: &str, value: Value, ttl: &TtlStore) {
        let guard = self.entries.write();
        ttl.clear(key);
        guard.insert(key.to_string(), KeyEntity { value, lru_tick: self.clock.now_tick() });
    }

    /// Looks up `key`, consulting TTL and refreshing the LRU tick on hit.
    /// Returns `None` for both "never existed" and "expired".
    pub fn find<R>(&self, key: &str, ttl: &TtlStore, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let guard = self.entries.write();
        let now = now_ms();
        if ttl.has_expired(key, now) {
            guard.remove(key);
            ttl.clear(key);
            return None;
        }
        let mut entry = guard.get_mut(key)?;
        entry.lru_tick = self.clock.now_tick();
        Some(f(&mut entry.value))
    }

    /// Inspects `key` without consulting TTL or touching LRU bookkeeping.
    /// Used by the evicter, which must not itself look "recently used".
    pub fn find_raw<R>(&self, key: &str, f: impl FnOnce(&KeyEntity) -> R) -> Option<R> {
        let guard = self.entries.read();
        guard.get(key).map(|e| f(&e))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn delete(&self, keys: &[String], ttl: &TtlStore) -> usize {
        let guard = self.entries.write();
        keys.iter()
            .filter(|k| {
                ttl.clear(k);
                guard.remove(*k).is_some()
            })
            .count()
    }

    pub fn random_remove(&self, count: usize, ttl: &TtlStore) -> Vec<String> {
        let guard = self.entries.write();
        let mut rng = rand::rng();
        let picked: Vec<String> = guard.iter().map(|e| e.key().clone()).choose_multiple(&mut rng, count);
        for k in &picked {
            ttl.clear(k);
            guard.remove(k);
        }
        picked
    }

    pub fn sample_keys(&self, count: usize) -> Vec<String> {
        let mut rng = rand::rng();
        self.entries.read().iter().map(|e| e.key().clone()).choose_multiple(&mut rng, count)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn idle(&self, key: &str) -> Option<f64> {
        self.entries.read().get(key).map(|e| self.clock.idle(e.lru_tick))
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before unix epoch").as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> Dict {
        Dict::new(LruClock::new(0.01))
    }

    #[test]
    fn add_then_find_round_trip() {
        let d = dict();
        let ttl = TtlStore::new();
        d.add("k", Value::StringRef, &ttl);
        let found = d.find("k", &ttl, |v| v.type_name());
        assert_eq!(found, Some("string"));
    }

    #[test]
    fn find_expired_key_returns_none_and_evicts() {
        let d = dict();
        let ttl = TtlStore::new();
        d.add("k", Value::StringRef, &ttl);
        ttl.set("k", 0);
        assert_eq!(d.find("k", &ttl, |_| ()), None);
        assert!(!d.contains("k"));
    }

    #[test]
    fn delete_removes_entry_and_ttl() {
        let d = dict();
        let ttl = TtlStore::new();
        d.add("k", Value::StringRef, &ttl);
        ttl.set("k", 5000);
        let removed = d.delete(&["k".to_string()], &ttl);
        assert_eq!(removed, 1);
        assert!(!d.contains("k"));
        assert_eq!(ttl.get("k"), None);
    }

    #[test]
    fn random_remove_respects_count() {
        let d = dict();
        let ttl = TtlStore::new();
        for i in 0..10 {
            d.add(&format!("k{i}"), Value::StringRef, &ttl);
        }
        let removed = d.random_remove(3, &ttl);
        assert_eq!(removed.len(), 3);
        assert_eq!(d.len(), 7);
    }
}
