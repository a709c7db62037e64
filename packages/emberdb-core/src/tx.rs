//! `Tx`: the typed method surface exposed inside `Database::update`/`view`.
//!
//! Every write method performs its mutation immediately against live
//! state (by delegating to a `Database::apply_*` helper) and records a
//! matching [`Action`] in `writes`, in call order. `Database::update`
//! drains `writes` into the log only if the closure returns `Ok`.

use crate::actions::Action;
use crate::containers::zset::skiplist::{ScoreBound, ScoreRangeOptions};
use crate::db::{now_ms, Database};
use crate::error::{DbError, DbResult};
use crate::value::Scalar;

pub struct Tx<'a> {
    db: &'a Database,
    writes: Vec<Action>,
}

impl<'a> Tx<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Tx { db, writes: Vec::new() }
    }

    pub(crate) fn take_writes(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.writes)
    }

    pub(crate) fn writes_is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn record(&mut self, action: Action) {
        self.writes.push(action);
    }

    // ---- string family -------------------------------------------------

    pub fn exists(&self, key: &str) -> bool {
        self.db.exists(key)
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<Vec<u8>>) -> DbResult<()> {
        let value = value.into();
        self.db.apply_set_string(key, value.clone());
        self.record(Action::SetString { key: key.to_string(), value });
        Ok(())
    }

    pub fn get(&self, key: &str) -> DbResult<Vec<u8>> {
        self.db.get_string(key)
    }

    pub fn get_del(&mut self, key: &str) -> DbResult<Vec<u8>> {
        let value = self.db.get_string(key)?;
        self.db.apply_delete(&[key.to_string()]);
        self.record(Action::GetDel { key: key.to_string() });
        Ok(value)
    }

    pub fn get_ex(&mut self, key: &str, ttl_ms: i64) -> DbResult<Vec<u8>> {
        let value = self.db.get_string(key)?;
        let deadline = abs_deadline(ttl_ms);
        self.db.apply_set_expire(key, deadline);
        self.record(Action::GetEx { key: key.to_string(), deadline_ms: deadline });
        Ok(value)
    }

    pub fn get_range(&self, key: &str, start: i64, end: i64) -> DbResult<Vec<u8>> {
        let value = self.db.get_string(key)?;
        let len = value.len() as i64;
        let norm = |i: i64| if i < 0 { (i + len).max(0) } else { i.min(len) };
        let (s, e) = (norm(start), norm(end));
        if s >= e {
            return Ok(Vec::new());
        }
        Ok(value[s as usize..e as usize].to_vec())
    }

    pub fn m_get(&self, keys: &[String]) -> Vec<Option<Vec<u8>>> {
        keys.iter().map(|k| self.db.get_string(k).ok()).collect()
    }

    pub fn m_set(&mut self, pairs: Vec<(String, Vec<u8>)>) -> DbResult<()> {
        for (k, v) in &pairs {
            self.db.apply_set_string(k, v.clone());
        }
        self.record(Action::MSet { pairs });
        Ok(())
    }

    pub fn append(&mut self, key: &str, value: impl Into<Vec<u8>>) -> DbResult<()> {
        let value = value.into();
        self.db.apply_append(key, value.clone());
        self.record(Action::Append { key: key.to_string(), value });
        Ok(())
    }

    pub fn incr_by(&mut self, key: &str, delta: i64) -> DbResult<i64> {
        let next = self.db.apply_incr_by(key, delta)?;
        self.record(Action::IncrBy { key: key.to_string(), delta });
        Ok(next)
    }

    pub fn decr_by(&mut self, key: &str, delta: i64) -> DbResult<i64> {
        self.incr_by(key, -delta)
    }

    pub fn incr(&mut self, key: &str) -> DbResult<i64> {
        self.incr_by(key, 1)
    }

    pub fn decr(&mut self, key: &str) -> DbResult<i64> {
        self.incr_by(key, -1)
    }

    pub fn set_expire(&mut self, key: &str, ttl_ms: i64) -> DbResult<()> {
        if !self.db.exists(key) {
            return Err(DbError::key_not_found(key));
        }
        let deadline = abs_deadline(ttl_ms);
        self.db.apply_set_expire(key, deadline);
        self.record(Action::SetExpire { key: key.to_string(), deadline_ms: deadline });
        Ok(())
    }

    /// Longest common subsequence of the two string values at `key_a`
    /// and `key_b`.
    pub fn lcs(&self, key_a: &str, key_b: &str) -> DbResult<Vec<u8>> {
        let a = self.db.get_string(key_a)?;
        let b = self.db.get_string(key_b)?;
        Ok(longest_common_subsequence(&a, &b))
    }

    /// Removes `keys` regardless of their container type. Returns how
    /// many actually existed.
    pub fn del(&mut self, keys: Vec<String>) -> DbResult<usize> {
        let existed = keys.iter().filter(|k| self.db.exists(k)).count();
        self.db.apply_delete(&keys);
        self.record(Action::Delete { keys });
        Ok(existed)
    }

    // ---- hash family -----------------------------------------------------

    pub fn h_set(&mut self, key: &str, field: &str, value: impl Into<Vec<u8>>) -> DbResult<()> {
        let value = value.into();
        self.db.apply_hset(key, field, value.clone())?;
        self.record(Action::HSet { key: key.to_string(), field: field.to_string(), value });
        Ok(())
    }

    pub fn h_get(&self, key: &str, field: &str) -> DbResult<Vec<u8>> {
        self.db.h_get(key, field)
    }

    pub fn h_get_all(&self, key: &str) -> DbResult<Vec<(String, Vec<u8>)>> {
        self.db.h_get_all(key)
    }

    pub fn h_exists(&self, key: &str, field: &str) -> DbResult<bool> {
        self.db.h_exists(key, field)
    }

    pub fn h_del(&mut self, key: &str, fields: Vec<String>) -> DbResult<usize> {
        let removed = self.db.apply_hdel(key, &fields);
        self.record(Action::HDel { key: key.to_string(), fields });
        Ok(removed)
    }

    pub fn h_incr_by(&mut self, key: &str, field: &str, delta: i64) -> DbResult<i64> {
        let next = self.db.apply_hincr_by(key, field, delta)?;
        self.record(Action::HIncrBy { key: key.to_string(), field: field.to_string(), delta });
        Ok(next)
    }

    pub fn h_keys(&self, key: &str) -> DbResult<Vec<String>> {
        self.db.h_keys(key)
    }

    pub fn h_len(&self, key: &str) -> DbResult<usize> {
        self.db.h_len(key)
    }

    pub fn h_vals(&self, key: &str) -> DbResult<Vec<Vec<u8>>> {
        self.db.h_vals(key)
    }

    // ---- list family -----------------------------------------------------

    /// Appends to the list tail.
    pub fn l_push(&mut self, key: &str, values: Vec<Vec<u8>>) -> DbResult<()> {
        self.db.apply_lpush(key, values.clone())?;
        self.record(Action::LPush { key: key.to_string(), values });
        Ok(())
    }

    /// Removes from the list tail.
    pub fn l_pop(&mut self, key: &str, count: usize) -> DbResult<Vec<Vec<u8>>> {
        let popped = self.db.apply_lpop(key, count);
        self.record(Action::LPop { key: key.to_string(), count });
        Ok(popped)
    }

    pub fn l_index(&self, key: &str, index: usize) -> DbResult<Vec<u8>> {
        self.db.l_index(key, index)
    }

    pub fn l_len(&self, key: &str) -> DbResult<usize> {
        self.db.l_len(key)
    }

    pub fn l_range(&self, key: &str, start: usize, end: usize) -> DbResult<Vec<Vec<u8>>> {
        self.db.l_range(key, start, end)
    }

    pub fn l_insert(&mut self, key: &str, index: usize, value: impl Into<Vec<u8>>) -> DbResult<()> {
        let value = value.into();
        self.db.apply_linsert(key, index, value.clone())?;
        self.record(Action::LInsert { key: key.to_string(), index, value });
        Ok(())
    }

    // ---- set family --------------------------------------------------

    pub fn s_add(&mut self, key: &str, members: Vec<Scalar>) -> DbResult<usize> {
        let added = self.db.apply_sadd(key, members.clone())?;
        self.record(Action::SAdd { key: key.to_string(), members });
        Ok(added)
    }

    pub fn s_rem(&mut self, key: &str, members: Vec<Scalar>) -> DbResult<usize> {
        let removed = self.db.apply_srem(key, &members);
        self.record(Action::SRem { key: key.to_string(), members });
        Ok(removed)
    }

    pub fn s_is_member(&self, key: &str, member: &Scalar) -> DbResult<bool> {
        self.db.s_is_member(key, member)
    }

    pub fn s_card(&self, key: &str) -> DbResult<usize> {
        self.db.s_card(key)
    }

    pub fn s_mismembers(&self, key: &str, members: &[Scalar]) -> DbResult<Vec<bool>> {
        self.db.s_mismembers(key, members)
    }

    pub fn s_diff(&self, key: &str, others: &[String]) -> DbResult<Vec<Scalar>> {
        self.db.s_diff(key, others)
    }

    pub fn s_inter(&self, keys: &[String]) -> DbResult<Vec<Scalar>> {
        self.db.s_inter(keys)
    }

    pub fn s_union(&self, keys: &[String]) -> DbResult<Vec<Scalar>> {
        self.db.s_union(keys)
    }

    pub fn s_members(&self, key: &str) -> DbResult<Vec<Scalar>> {
        self.db.s_members(key)
    }

    pub fn s_pop(&mut self, key: &str, count: usize) -> DbResult<Vec<Scalar>> {
        let popped = self.db.apply_spop(key, count);
        self.record(Action::SPop { key: key.to_string(), count });
        Ok(popped)
    }

    pub fn s_rand_member(&self, key: &str, count: usize) -> DbResult<Vec<Scalar>> {
        self.db.s_rand_member(key, count)
    }

    // ---- zset family -----------------------------------------------------

    pub fn z_add(&mut self, key: &str, members: Vec<(String, f64)>) -> DbResult<usize> {
        let added = self.db.apply_zadd(key, members.clone())?;
        self.record(Action::ZAdd { key: key.to_string(), members });
        Ok(added)
    }

    pub fn z_rem(&mut self, key: &str, members: Vec<String>) -> DbResult<usize> {
        let removed = self.db.apply_zrem(key, &members);
        self.record(Action::ZRem { key: key.to_string(), members });
        Ok(removed)
    }

    pub fn z_card(&self, key: &str) -> DbResult<u64> {
        self.db.z_card(key)
    }

    pub fn z_score(&self, key: &str, member: &str) -> DbResult<f64> {
        self.db.z_score(key, member)
    }

    pub fn z_rank(&self, key: &str, member: &str) -> DbResult<u64> {
        self.db.z_rank(key, member)
    }

    pub fn z_rev_rank(&self, key: &str, member: &str) -> DbResult<u64> {
        let card = self.db.z_card(key)?;
        let rank = self.db.z_rank(key, member)?;
        Ok(card - 1 - rank)
    }

    pub fn z_range(&self, key: &str, start: i64, stop: i64) -> DbResult<Vec<String>> {
        self.db.z_range(key, start, stop, false)
    }

    pub fn z_range_with_scores(&self, key: &str, start: i64, stop: i64) -> DbResult<Vec<(String, f64)>> {
        self.db.z_range_with_scores(key, start, stop, false)
    }

    pub fn z_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
        opts: ScoreRangeOptions,
    ) -> DbResult<Vec<(String, f64)>> {
        self.db.z_range_by_score(key, min, max, opts)
    }

    /// Does NOT auto-create a missing member; `member` must already exist
    /// via a prior `z_add`.
    pub fn z_incr_by(&mut self, key: &str, member: &str, delta: f64) -> DbResult<f64> {
        let next = self.db.apply_zincr_by(key, member, delta)?;
        self.record(Action::ZIncrBy { key: key.to_string(), member: member.to_string(), delta });
        Ok(next)
    }

    pub fn z_diff(&self, key: &str, others: &[String]) -> DbResult<Vec<(String, f64)>> {
        self.db.z_diff(key, others)
    }

    pub fn z_diff_card(&self, key: &str, others: &[String]) -> DbResult<usize> {
        Ok(self.db.z_diff(key, others)?.len())
    }

    pub fn z_diff_store(&mut self, dest: &str, key: &str, others: &[String]) -> DbResult<usize> {
        let members = self.db.z_diff(key, others)?;
        let count = members.len();
        self.db.apply_zstore(dest, members.clone());
        self.record(Action::ZStore { key: dest.to_string(), members });
        Ok(count)
    }

    pub fn z_inter(&self, keys: &[String]) -> DbResult<Vec<(String, f64)>> {
        self.db.z_inter(keys)
    }

    pub fn z_inter_card(&self, keys: &[String]) -> DbResult<usize> {
        Ok(self.db.z_inter(keys)?.len())
    }

    pub fn z_inter_store(&mut self, dest: &str, keys: &[String]) -> DbResult<usize> {
        let members = self.db.z_inter(keys)?;
        let count = members.len();
        self.db.apply_zstore(dest, members.clone());
        self.record(Action::ZStore { key: dest.to_string(), members });
        Ok(count)
    }

    pub fn z_union(&self, keys: &[String]) -> DbResult<Vec<(String, f64)>> {
        self.db.z_union(keys)
    }

    pub fn z_union_card(&self, keys: &[String]) -> DbResult<usize> {
        Ok(self.db.z_union(keys)?.len())
    }

    pub fn z_union_store(&mut self, dest: &str, keys: &[String]) -> DbResult<usize> {
        let members = self.db.z_union(keys)?;
        let count = members.len();
        self.db.apply_zstore(dest, members.clone());
        self.record(Action::ZStore { key: dest.to_string(), members });
        Ok(count)
    }
}

/// `-1` passes through unchanged (never-expires sentinel); any other
/// value is interpreted as a millisecond duration from now.
fn abs_deadline(ttl_ms: i64) -> i64 {
    if ttl_ms == -1 {
        -1
    } else {
        now_ms() + ttl_ms
    }
}

fn longest_common_subsequence(a: &[u8], b: &[u8]) -> Vec<u8> {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if a[i - 1] == b[j - 1] { dp[i - 1][j - 1] + 1 } else { dp[i - 1][j].max(dp[i][j - 1]) };
        }
    }
    let mut out = Vec::new();
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            out.push(a[i - 1]);
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] >= dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    out.reverse();
    out
}
