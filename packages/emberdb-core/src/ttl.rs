//! Key -> absolute expiration deadline (milliseconds since epoch).

use dashmap::DashMap;
use rand::seq::IteratorRandom;

#[derive(Debug, Default)]
pub struct TtlStore {
    deadlines: DashMap<String, i64>,
}

impl TtlStore {
    pub fn new() -> Self {
        TtlStore { deadlines: DashMap::new() }
    }

    pub fn set(&self, key: &str, deadline_ms: i64) {
        self.deadlines.insert(key.to_string(), deadline_ms);
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.deadlines.get(key).map(|v| *v)
    }

    pub fn clear(&self, key: &str) {
        self.deadlines.remove(key);
    }

    pub fn has_expired(&self, key: &str, now_ms: i64) -> bool {
        match self.get(key) {
            Some(deadline) => deadline != -1 && now_ms >= deadline,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Every key currently expired as of `now_ms`.
    pub fn expired_keys(&self, now_ms: i64) -> Vec<String> {
        self.deadlines
            .iter()
            .filter(|e| *e.value() != -1 && now_ms >= *e.value())
            .map(|e| e.key().clone())
            .collect()
    }

    /// Up to `count` distinct keys, sampled without replacement.
    pub fn sample_keys(&self, count: usize) -> Vec<String> {
        let mut rng = rand::rng();
        self.deadlines.iter().map(|e| e.key().clone()).choose_multiple(&mut rng, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trip() {
        let t = TtlStore::new();
        t.set("k", 1000);
        assert_eq!(t.get("k"), Some(1000));
    }

    #[test]
    fn has_expired_honors_never_expires_sentinel() {
        let t = TtlStore::new();
        t.set("k", -1);
        assert!(!t.has_expired("k", i64::MAX));
    }

    #[test]
    fn has_expired_true_once_deadline_passed() {
        let t = TtlStore::new();
        t.set("k", 1000);
        assert!(!t.has_expired("k", 999));
        assert!(t.has_expired("k", 1000));
    }

    #[test]
    fn expired_keys_lists_only_past_deadline_keys() {
        let t = TtlStore::new();
        t.set("a", 500);
        t.set("b", 1500);
        let expired = t.expired_keys(1000);
        assert_eq!(expired, vec!["a".to_string()]);
    }

    #[test]
    fn clear_removes_ttl_entry() {
        let t = TtlStore::new();
        t.set("k", 1000);
        t.clear("k");
        assert_eq!(t.get("k"), None);
    }

    #[test]
    fn sample_keys_respects_requested_count() {
        let t = TtlStore::new();
        for i in 0..10 {
            t.set(&format!("k{i}"), 1000);
        }
        assert_eq!(t.sample_keys(3).len(), 3);
        assert_eq!(t.sample_keys(100).len(), 10);
    }
}
