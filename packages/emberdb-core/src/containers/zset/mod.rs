//! Ordered set: a skip list paired with a member -> score index so score
//! lookups don't require a skip-list walk.

pub mod skiplist;

use ahash::AHashMap;

use self::skiplist::{ScoreBound, ScoreRangeOptions, SkipList};

#[derive(Debug)]
pub struct ZsetObject {
    skiplist: SkipList,
    scores: AHashMap<String, f64>,
}

impl ZsetObject {
    pub fn new() -> Self {
        ZsetObject { skiplist: SkipList::new(), scores: AHashMap::new() }
    }

    /// Adds or re-scores `member`. Returns `true` if the member is new.
    pub fn add(&mut self, member: &str, score: f64) -> bool {
        match self.scores.get(member).copied() {
            Some(old_score) if old_score == score => false,
            Some(old_score) => {
                self.skiplist.delete(old_score, member);
                self.skiplist.insert(score, member);
                self.scores.insert(member.to_string(), score);
                false
            }
            None => {
                self.skiplist.insert(score, member);
                self.scores.insert(member.to_string(), score);
                true
            }
        }
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.skiplist.delete(score, member);
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn card(&self) -> u64 {
        self.skiplist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skiplist.is_empty()
    }

    /// 0-based rank in ascending score order.
    pub fn rank(&self, member: &str) -> Option<u64> {
        let score = self.scores.get(member)?;
        self.skiplist.rank(*score, member)
    }

    /// 0-based rank in descending score order.
    pub fn rev_rank(&self, member: &str) -> Option<u64> {
        let fwd = self.rank(member)?;
        Some(self.card() - 1 - fwd)
    }

    /// Increments `member`'s score by `delta`. Unlike most ordered-set
    /// implementations, a missing member is NOT auto-created: the caller
    /// must `add` the member first.
    pub fn incr_by(&mut self, member: &str, delta: f64) -> Option<f64> {
        let current = *self.scores.get(member)?;
        let next = current + delta;
        self.add(member, next);
        Some(next)
    }

    fn normalize_index(&self, idx: i64) -> i64 {
        if idx < 0 {
            idx + self.card() as i64
        } else {
            idx
        }
    }

    pub fn range(&self, start: i64, stop: i64, reverse: bool) -> Vec<(String, f64)> {
        if self.is_empty() {
            return Vec::new();
        }
        let len = self.card() as i64;
        let mut start = self.normalize_index(start).max(0);
        let mut stop = self.normalize_index(stop);
        if stop >= len {
            stop = len - 1;
        }
        if start > stop || start >= len {
            return Vec::new();
        }
        if stop < 0 {
            stop = 0;
        }
        if start < 0 {
            start = 0;
        }
        self.skiplist.range_by_rank(start as u64, stop as u64, reverse)
    }

    pub fn range_by_score(&self, min: ScoreBound, max: ScoreBound, opts: ScoreRangeOptions) -> Vec<(String, f64)> {
        self.skiplist.range_by_score(min, max, opts)
    }

    pub fn members(&self) -> Vec<(String, f64)> {
        self.skiplist.iter().collect()
    }
}

impl Default for ZsetObject {
    fn default() -> Self {
        Self::new()
    }
}

/// Members present in `target` but not in any of `others`.
pub fn diff(target: &ZsetObject, others: &[&ZsetObject]) -> ZsetObject {
    let mut out = ZsetObject::new();
    for (member, score) in target.members() {
        if !others.iter().any(|o| o.score(&member).is_some()) {
            out.add(&member, score);
        }
    }
    out
}

/// Members present in every input zset; scores sum across inputs.
pub fn inter(zsets: &[&ZsetObject]) -> ZsetObject {
    let mut out = ZsetObject::new();
    if zsets.is_empty() {
        return out;
    }
    let mut sorted: Vec<&&ZsetObject> = zsets.iter().collect();
    sorted.sort_by_key(|z| z.card());
    let (smallest, rest) = sorted.split_first().unwrap();
    for (member, score) in smallest.members() {
        let mut total = score;
        let mut in_all = true;
        for other in rest {
            match other.score(&member) {
                Some(s) => total += s,
                None => {
                    in_all = false;
                    break;
                }
            }
        }
        if in_all {
            out.add(&member, total);
        }
    }
    out
}

/// Every member across the inputs; duplicate members sum their scores.
pub fn union(zsets: &[&ZsetObject]) -> ZsetObject {
    let mut out = ZsetObject::new();
    for z in zsets {
        for (member, score) in z.members() {
            match out.score(&member) {
                Some(existing) => {
                    out.add(&member, existing + score);
                }
                None => {
                    out.add(&member, score);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_new_member_then_score() {
        let mut z = ZsetObject::new();
        assert!(z.add("a", 1.0));
        assert_eq!(z.score("a"), Some(1.0));
    }

    #[test]
    fn re_add_with_new_score_updates_rank() {
        let mut z = ZsetObject::new();
        z.add("a", 1.0);
        z.add("b", 2.0);
        z.add("a", 3.0);
        assert_eq!(z.rank("b"), Some(0));
        assert_eq!(z.rank("a"), Some(1));
    }

    #[test]
    fn rank_and_rev_rank_are_asymmetric_complements() {
        let mut z = ZsetObject::new();
        z.add("a", 1.0);
        z.add("b", 2.0);
        z.add("c", 3.0);
        assert_eq!(z.rank("a"), Some(0));
        assert_eq!(z.rev_rank("a"), Some(2));
        assert_eq!(z.rank("c"), Some(2));
        assert_eq!(z.rev_rank("c"), Some(0));
    }

    #[test]
    fn incr_by_does_not_auto_create_missing_member() {
        let mut z = ZsetObject::new();
        assert_eq!(z.incr_by("ghost", 5.0), None);
        assert!(z.score("ghost").is_none());
    }

    #[test]
    fn incr_by_updates_existing_member_score() {
        let mut z = ZsetObject::new();
        z.add("a", 1.0);
        assert_eq!(z.incr_by("a", 4.0), Some(5.0));
    }

    #[test]
    fn range_returns_ascending_slice() {
        let mut z = ZsetObject::new();
        for i in 0..100 {
            z.add(&format!("member_{i}"), i as f64);
        }
        assert_eq!(z.card(), 100);
        for i in 0..100 {
            assert_eq!(z.range(i, i, false), vec![(format!("member_{i}"), i as f64)]);
        }
    }

    #[test]
    fn diff_inter_union_behave_as_set_algebra() {
        let mut a = ZsetObject::new();
        a.add("x", 1.0);
        a.add("y", 2.0);
        let mut b = ZsetObject::new();
        b.add("y", 10.0);

        let d = diff(&a, &[&b]);
        assert_eq!(d.members(), vec![("x".to_string(), 1.0)]);

        let i = inter(&[&a, &b]);
        assert_eq!(i.score("y"), Some(12.0));

        let u = union(&[&a, &b]);
        assert_eq!(u.card(), 2);
        assert_eq!(u.score("y"), Some(12.0));
    }
}
