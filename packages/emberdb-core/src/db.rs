//! The keyspace engine: dictionary, string store, TTL store and the
//! internal mutation primitives shared by live transactions and log
//! replay.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};

use crate::actions::Action;
use crate::clock::LruClock;
use crate::config::DbConfig;
use crate::containers::hash::HashObject;
use crate::containers::list::quicklist::QuickList;
use crate::containers::set::{self, SetObject};
use crate::containers::zset::{self, skiplist::{ScoreBound, ScoreRangeOptions}, ZsetObject};
use crate::dict::Dict;
use crate::error::{DbError, DbResult};
use crate::log::Log;
use crate::radix::RadixTree;
use crate::ttl::TtlStore;
use crate::value::{Scalar, Value};

pub fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before unix epoch").as_millis() as i64
}

pub struct Database {
    pub(crate) config: DbConfig,
    pub(crate) strings: RwLock<RadixTree>,
    pub(crate) dict: Dict,
    pub(crate) ttl: TtlStore,
    pub(crate) clock: LruClock,
    log: Mutex<Log>,
    /// Global single-writer coordination lock. Distinct from `Dict`'s
    /// internal lock, which only protects the key map itself.
    coordination: RwLock<()>,
}

impl Database {
    pub fn open(config: DbConfig) -> DbResult<Self> {
        let clock = LruClock::new(config.lru_clock_resolution);
        let log = Log::open(&config.aof_path, config.max_seg_size, config.flush_policy)?;
        let db = Database {
            strings: RwLock::new(RadixTree::new()),
            dict: Dict::new(clock),
            ttl: TtlStore::new(),
            clock,
            log: Mutex::new(log),
            coordination: RwLock::new(()),
            config,
        };
        db.recover()?;
        Ok(db)
    }

    fn recover(&self) -> DbResult<()> {
        let mut applied = 0u64;
        let records = self.log.lock().iter_records()?;
        for action in records {
            action?.apply(self);
            applied += 1;
        }
        tracing::info!(records_applied = applied, "recovery complete");
        Ok(())
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Runs `f` under the exclusive writer lock, then appends every
    /// action `f` queued, in invocation order, to the log. If `f` returns
    /// `Err`, no log append happens (mutations already made are not
    /// reverted -- see DESIGN.md).
    pub fn update<R>(&self, f: impl FnOnce(&mut crate::tx::Tx<'_>) -> DbResult<R>) -> DbResult<R> {
        let _guard = self.coordination.write();
        let span = tracing::info_span!("tx.update");
        let _enter = span.enter();
        let mut tx = crate::tx::Tx::new(self);
        let result = f(&mut tx);
        match result {
            Ok(value) => {
                let mut log = self.log.lock();
                for action in tx.take_writes() {
                    log.append(action)?;
                }
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, "update closure failed, writes not logged");
                Err(e)
            }
        }
    }

    /// Runs `f` under a shared reader lock. Returns
    /// `DbError::ContractViolation` if `f` queued any writes.
    pub fn view<R>(&self, f: impl FnOnce(&mut crate::tx::Tx<'_>) -> DbResult<R>) -> DbResult<R> {
        let _guard = self.coordination.read();
        let span = tracing::info_span!("tx.view");
        let _enter = span.enter();
        let mut tx = crate::tx::Tx::new(self);
        let result = f(&mut tx);
        if !tx.writes_is_empty() {
            return Err(DbError::ContractViolation("write performed inside view"));
        }
        result
    }

    // ---- string family -------------------------------------------------

    pub fn get_string(&self, key: &str) -> DbResult<Vec<u8>> {
        self.ensure_string_kind(key)?;
        self.strings.read().get(key.as_bytes()).map(|v| v.to_vec()).ok_or_else(|| DbError::key_not_found(key))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.dict
            .find_raw(key, |_| ())
            .is_some_and(|_| !self.ttl.has_expired(key, now_ms()))
    }

    fn ensure_string_kind(&self, key: &str) -> DbResult<()> {
        match self.dict.find(key, &self.ttl, |v| v.type_name()) {
            Some("string") => Ok(()),
            Some(other) => Err(DbError::wrong_type(key, other, "string")),
            None => Err(DbError::key_not_found(key)),
        }
    }

    pub(crate) fn apply_set_string(&self, key: &str, value: Vec<u8>) {
        self.strings.write().set(key.as_bytes(), value);
        self.dict.add(key, Value::StringRef, &self.ttl);
    }

    pub(crate) fn apply_append(&self, key: &str, value: Vec<u8>) {
        let mut existing = self.strings.read().get(key.as_bytes()).map(<[u8]>::to_vec).unwrap_or_default();
        existing.extend_from_slice(&value);
        self.strings.write().set(key.as_bytes(), existing);
        if !self.dict.contains(key) {
            self.dict.add(key, Value::StringRef, &self.ttl);
        }
    }

    pub(crate) fn apply_incr_by(&self, key: &str, delta: i64) -> DbResult<i64> {
        let current = match self.strings.read().get(key.as_bytes()) {
            Some(bytes) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| DbError::Parse(format!("value at {key} is not an integer")))?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or_else(|| DbError::Parse("increment overflow".to_string()))?;
        self.strings.write().set(key.as_bytes(), next.to_string().into_bytes());
        if !self.dict.contains(key) {
            self.dict.add(key, Value::StringRef, &self.ttl);
        }
        Ok(next)
    }

    pub(crate) fn apply_set_expire(&self, key: &str, deadline_ms: i64) {
        self.ttl.set(key, deadline_ms);
    }

    pub(crate) fn apply_delete(&self, keys: &[String]) -> usize {
        for key in keys {
            self.strings.write().delete(key.as_bytes());
        }
        self.dict.delete(keys, &self.ttl)
    }

    // ---- hash family -----------------------------------------------------

    fn with_hash<R>(&self, key: &str, f: impl FnOnce(&mut HashObject) -> DbResult<R>) -> DbResult<R> {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::Hash(h) => f(h),
                other => Err(DbError::wrong_type(key, other.type_name(), "hash")),
            })
            .unwrap_or_else(|| Err(DbError::key_not_found(key)))
    }

    fn with_hash_autocreate<R>(&self, key: &str, f: impl FnOnce(&mut HashObject) -> R) -> DbResult<R> {
        if let Some(result) = self.dict.find(key, &self.ttl, |v| match v {
            Value::Hash(h) => Ok(f(h)),
            other => Err(DbError::wrong_type(key, other.type_name(), "hash")),
        }) {
            return result;
        }
        let mut h = HashObject::new();
        let result = f(&mut h);
        self.dict.add(key, Value::Hash(h), &self.ttl);
        Ok(result)
    }

    pub(crate) fn apply_hset(&self, key: &str, field: &str, value: Vec<u8>) -> DbResult<()> {
        self.with_hash_autocreate(key, |h| {
            h.set(field, value);
        })
    }

    pub fn h_get(&self, key: &str, field: &str) -> DbResult<Vec<u8>> {
        self.with_hash(key, |h| h.get(field).map(<[u8]>::to_vec).ok_or_else(|| DbError::key_not_found(field)))
    }

    pub fn h_get_all(&self, key: &str) -> DbResult<Vec<(String, Vec<u8>)>> {
        self.with_hash(key, |h| Ok(h.all()))
    }

    pub fn h_exists(&self, key: &str, field: &str) -> DbResult<bool> {
        self.with_hash(key, |h| Ok(h.exists(field)))
    }

    pub(crate) fn apply_hdel(&self, key: &str, fields: &[String]) -> usize {
        self.with_hash(key, |h| Ok(h.del(fields))).unwrap_or(0)
    }

    pub(crate) fn apply_hincr_by(&self, key: &str, field: &str, delta: i64) -> DbResult<i64> {
        self.with_hash_autocreate(key, |h| h.incr_by(field, delta))?.map_err(DbError::Parse)
    }

    pub fn h_keys(&self, key: &str) -> DbResult<Vec<String>> {
        self.with_hash(key, |h| Ok(h.keys()))
    }

    pub fn h_len(&self, key: &str) -> DbResult<usize> {
        self.with_hash(key, |h| Ok(h.len()))
    }

    pub fn h_vals(&self, key: &str) -> DbResult<Vec<Vec<u8>>> {
        self.with_hash(key, |h| Ok(h.values()))
    }

    // ---- list family -----------------------------------------------------

    fn with_list<R>(&self, key: &str, f: impl FnOnce(&mut QuickList) -> DbResult<R>) -> DbResult<R> {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::List(l) => f(l),
                other => Err(DbError::wrong_type(key, other.type_name(), "list")),
            })
            .unwrap_or_else(|| Err(DbError::key_not_found(key)))
    }

    fn with_list_autocreate<R>(&self, key: &str, f: impl FnOnce(&mut QuickList) -> R) -> DbResult<R> {
        if let Some(result) = self.dict.find(key, &self.ttl, |v| match v {
            Value::List(l) => Ok(f(l)),
            other => Err(DbError::wrong_type(key, other.type_name(), "list")),
        }) {
            return result;
        }
        let mut l = QuickList::new(self.config.max_ziplist_size);
        let result = f(&mut l);
        self.dict.add(key, Value::List(l), &self.ttl);
        Ok(result)
    }

    /// Pushes to the list tail (mirrors the source's `l_push`, which is
    /// RPUSH-like despite the name).
    pub(crate) fn apply_lpush(&self, key: &str, values: Vec<Vec<u8>>) -> DbResult<()> {
        self.with_list_autocreate(key, |l| {
            for v in values {
                l.push_back(v);
            }
        })
    }

    /// Pops from the list tail, mirroring `apply_lpush`'s tail semantics.
    pub(crate) fn apply_lpop(&self, key: &str, count: usize) -> Vec<Vec<u8>> {
        self.with_list(key, |l| {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                match l.pop_back() {
                    Some(v) => out.push(v),
                    None => break,
                }
            }
            Ok(out)
        })
        .unwrap_or_default()
    }

    pub(crate) fn apply_linsert(&self, key: &str, index: usize, value: Vec<u8>) -> DbResult<()> {
        self.with_list_autocreate(key, |l| l.insert_at(index, value))
    }

    pub fn l_index(&self, key: &str, index: usize) -> DbResult<Vec<u8>> {
        self.with_list(key, |l| l.index(index).ok_or(DbError::IndexOutOfRange { index: index as i64, len: l.len() }))
    }

    pub fn l_len(&self, key: &str) -> DbResult<usize> {
        self.with_list(key, |l| Ok(l.len()))
    }

    pub fn l_range(&self, key: &str, start: usize, end: usize) -> DbResult<Vec<Vec<u8>>> {
        self.with_list(key, |l| Ok(l.range(start, end)))
    }

    // ---- set family --------------------------------------------------

    fn with_set<R>(&self, key: &str, f: impl FnOnce(&SetObject) -> DbResult<R>) -> DbResult<R> {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::Set(s) => f(s),
                other => Err(DbError::wrong_type(key, other.type_name(), "set")),
            })
            .unwrap_or_else(|| Err(DbError::key_not_found(key)))
    }

    fn with_set_autocreate<R>(&self, key: &str, f: impl FnOnce(&mut SetObject) -> R) -> DbResult<R> {
        if let Some(result) = self.dict.find(key, &self.ttl, |v| match v {
            Value::Set(s) => Ok(f(s)),
            other => Err(DbError::wrong_type(key, other.type_name(), "set")),
        }) {
            return result;
        }
        let mut s = SetObject::new(self.config.max_intset_length);
        let result = f(&mut s);
        self.dict.add(key, Value::Set(s), &self.ttl);
        Ok(result)
    }

    pub(crate) fn apply_sadd(&self, key: &str, members: Vec<Scalar>) -> DbResult<usize> {
        self.with_set_autocreate(key, |s| members.into_iter().filter(|m| s.add(m.clone())).count())
    }

    pub(crate) fn apply_srem(&self, key: &str, members: &[Scalar]) -> usize {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::Set(s) => members.iter().filter(|m| s.remove(m)).count(),
                _ => 0,
            })
            .unwrap_or(0)
    }

    pub(crate) fn apply_spop(&self, key: &str, count: usize) -> Vec<Scalar> {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::Set(s) => s.pop(count),
                _ => Vec::new(),
            })
            .unwrap_or_default()
    }

    pub fn s_is_member(&self, key: &str, member: &Scalar) -> DbResult<bool> {
        self.with_set(key, |s| Ok(s.contains(member)))
    }

    pub fn s_card(&self, key: &str) -> DbResult<usize> {
        self.with_set(key, |s| Ok(s.len()))
    }

    pub fn s_members(&self, key: &str) -> DbResult<Vec<Scalar>> {
        self.with_set(key, |s| Ok(s.members()))
    }

    pub fn s_rand_member(&self, key: &str, count: usize) -> DbResult<Vec<Scalar>> {
        self.with_set(key, |s| Ok(s.random_members(count)))
    }

    pub fn s_mismembers(&self, key: &str, members: &[Scalar]) -> DbResult<Vec<bool>> {
        self.with_set(key, |s| Ok(members.iter().map(|m| s.contains(m)).collect()))
    }

    fn load_sets(&self, keys: &[String]) -> DbResult<Vec<SetObject>> {
        keys.iter()
            .map(|k| {
                self.dict
                    .find(k, &self.ttl, |v| match v {
                        Value::Set(s) => {
                            let mut clone = SetObject::new(self.config.max_intset_length);
                            for m in s.members() {
                                clone.add(m);
                            }
                            Ok(clone)
                        }
                        other => Err(DbError::wrong_type(k, other.type_name(), "set")),
                    })
                    .unwrap_or_else(|| Err(DbError::key_not_found(k)))
            })
            .collect()
    }

    pub fn s_diff(&self, key: &str, others: &[String]) -> DbResult<Vec<Scalar>> {
        let target = self.load_sets(std::slice::from_ref(&key.to_string()))?;
        let other_sets = self.load_sets(others)?;
        let refs: Vec<&SetObject> = other_sets.iter().collect();
        Ok(set::diff(&target[0], &refs))
    }

    pub fn s_inter(&self, keys: &[String]) -> DbResult<Vec<Scalar>> {
        let sets = self.load_sets(keys)?;
        let refs: Vec<&SetObject> = sets.iter().collect();
        Ok(set::inter(&refs))
    }

    pub fn s_union(&self, keys: &[String]) -> DbResult<Vec<Scalar>> {
        let sets = self.load_sets(keys)?;
        let refs: Vec<&SetObject> = sets.iter().collect();
        Ok(set::union(&refs))
    }

    // ---- zset family -----------------------------------------------------

    fn with_zset<R>(&self, key: &str, f: impl FnOnce(&ZsetObject) -> DbResult<R>) -> DbResult<R> {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::ZSet(z) => f(z),
                other => Err(DbError::wrong_type(key, other.type_name(), "zset")),
            })
            .unwrap_or_else(|| Err(DbError::key_not_found(key)))
    }

    fn with_zset_autocreate<R>(&self, key: &str, f: impl FnOnce(&mut ZsetObject) -> R) -> DbResult<R> {
        if let Some(result) = self.dict.find(key, &self.ttl, |v| match v {
            Value::ZSet(z) => Ok(f(z)),
            other => Err(DbError::wrong_type(key, other.type_name(), "zset")),
        }) {
            return result;
        }
        let mut z = ZsetObject::new();
        let result = f(&mut z);
        self.dict.add(key, Value::ZSet(z), &self.ttl);
        Ok(result)
    }

    pub(crate) fn apply_zadd(&self, key: &str, members: Vec<(String, f64)>) -> DbResult<usize> {
        self.with_zset_autocreate(key, |z| members.into_iter().filter(|(m, s)| z.add(m, *s)).count())
    }

    pub(crate) fn apply_zrem(&self, key: &str, members: &[String]) -> usize {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::ZSet(z) => members.iter().filter(|m| z.remove(m)).count(),
                _ => 0,
            })
            .unwrap_or(0)
    }

    pub(crate) fn apply_zincr_by(&self, key: &str, member: &str, delta: f64) -> DbResult<f64> {
        self.dict
            .find(key, &self.ttl, |v| match v {
                Value::ZSet(z) => z.incr_by(member, delta).ok_or_else(|| DbError::key_not_found(member)),
                other => Err(DbError::wrong_type(key, other.type_name(), "zset")),
            })
            .unwrap_or_else(|| Err(DbError::key_not_found(key)))
    }

    pub(crate) fn apply_zstore(&self, key: &str, members: Vec<(String, f64)>) {
        let mut z = ZsetObject::new();
        for (m, s) in members {
            z.add(&m, s);
        }
        self.dict.delete(&[key.to_string()], &self.ttl);
        self.dict.add(key, Value::ZSet(z), &self.ttl);
    }

    pub fn z_card(&self, key: &str) -> DbResult<u64> {
        self.with_zset(key, |z| Ok(z.card()))
    }

    pub fn z_score(&self, key: &str, member: &str) -> DbResult<f64> {
        self.with_zset(key, |z| z.score(member).ok_or_else(|| DbError::key_not_found(member)))
    }

    pub fn z_rank(&self, key: &str, member: &str) -> DbResult<u64> {
        self.with_zset(key, |z| z.rank(member).ok_or_else(|| DbError::key_not_found(member)))
    }

    pub fn z_range(&self, key: &str, start: i64, stop: i64, reverse: bool) -> DbResult<Vec<String>> {
        self.with_zset(key, |z| Ok(z.range(start, stop, reverse).into_iter().map(|(m, _)| m).collect()))
    }

    pub fn z_range_with_scores(&self, key: &str, start: i64, stop: i64, reverse: bool) -> DbResult<Vec<(String, f64)>> {
        self.with_zset(key, |z| Ok(z.range(start, stop, reverse)))
    }

    pub fn z_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        opts: ScoreRangeOptions,
    ) -> DbResult<Vec<(String, f64)>> {
        self.with_zset(key, |z| Ok(z.range_by_score(min, max, opts)))
    }

    fn load_zsets(&self, keys: &[String]) -> DbResult<Vec<ZsetObject>> {
        keys.iter()
            .map(|k| {
                self.dict
                    .find(k, &self.ttl, |v| match v {
                        Value::ZSet(z) => {
                            let mut clone = ZsetObject::new();
                            for (m, s) in z.members() {
                                clone.add(&m, s);
                            }
                            Ok(clone)
                        }
                        other => Err(DbError::wrong_type(k, other.type_name(), "zset")),
                    })
                    .unwrap_or_else(|| Err(DbError::key_not_found(k)))
            })
            .collect()
    }

    pub fn z_diff(&self, key: &str, others: &[String]) -> DbResult<Vec<(String, f64)>> {
        let target = self.load_zsets(std::slice::from_ref(&key.to_string()))?;
        let other_sets = self.load_zsets(others)?;
        let refs: Vec<&ZsetObject> = other_sets.iter().collect();
        Ok(zset::diff(&target[0], &refs).members())
    }

    pub fn z_inter(&self, keys: &[String]) -> DbResult<Vec<(String, f64)>> {
        let sets = self.load_zsets(keys)?;
        let refs: Vec<&ZsetObject> = sets.iter().collect();
        Ok(zset::inter(&refs).members())
    }

    pub fn z_union(&self, keys: &[String]) -> DbResult<Vec<(String, f64)>> {
        let sets = self.load_zsets(keys)?;
        let refs: Vec<&ZsetObject> = sets.iter().collect();
        Ok(zset::union(&refs).members())
    }

    // ---- eviction / sweeping support --------------------------------

    pub fn dict_len(&self) -> usize {
        self.dict.len()
    }

    pub fn ttl_len(&self) -> usize {
        self.ttl.len()
    }

    pub fn sweep_expired(&self) -> usize {
        let expired = self.ttl.expired_keys(now_ms());
        if expired.is_empty() {
            return 0;
        }
        self.apply_delete(&expired)
    }

    pub fn evict_all_keys_random(&self) -> usize {
        let count = ((self.dict.len() as f64) * self.config.random_remove_factor) as usize;
        let removed = self.dict.random_remove(count.max(1).min(self.dict.len()), &self.ttl);
        for k in &removed {
            self.strings.write().delete(k.as_bytes());
        }
        removed.len()
    }

    pub fn evict_volatile_random(&self) -> usize {
        let count = ((self.ttl.len() as f64) * self.config.random_remove_factor) as usize;
        let keys = self.ttl.sample_keys(count.max(1).min(self.ttl.len().max(1)));
        self.apply_delete(&keys)
    }

    fn evict_lru_from(&self, candidates: Vec<String>) -> usize {
        let worst = candidates
            .into_iter()
            .filter_map(|k| self.dict.idle(&k).map(|idle| (k, idle)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match worst {
            Some((key, _)) => self.apply_delete(&[key]),
            None => 0,
        }
    }

    pub fn evict_all_keys_lru(&self) -> usize {
        let count = ((self.dict.len() as f64) * self.config.lru_sample_factor) as usize;
        let candidates = self.dict.sample_keys(count.max(1));
        self.evict_lru_from(candidates)
    }

    /// Samples only TTL-bearing keys, unlike the source system's
    /// `volatile-lru` policy, which (a latent bug there) sampled from the
    /// whole keyspace.
    pub fn evict_volatile_lru(&self) -> usize {
        let count = ((self.ttl.len() as f64) * self.config.lru_sample_factor) as usize;
        let candidates = self.ttl.sample_keys(count.max(1));
        self.evict_lru_from(candidates)
    }
}
