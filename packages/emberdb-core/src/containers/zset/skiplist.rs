//! Probabilistic skip list ordered by `(score, member)`, with per-level
//! span tracking for O(log n) rank queries.

use rand::Rng;

pub const MAX_LEVEL: usize = 32;
pub const P: f64 = 0.25;

struct Level {
    forward: Option<usize>,
    span: u64,
}

struct Node {
    member: String,
    score: f64,
    backward: Option<usize>,
    levels: Vec<Level>,
}

/// Inclusive/exclusive range bound over score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreBound {
    pub value: f64,
    pub exclusive: bool,
}

impl ScoreBound {
    pub fn inclusive(value: f64) -> Self {
        ScoreBound { value, exclusive: false }
    }

    pub fn exclusive(value: f64) -> Self {
        ScoreBound { value, exclusive: true }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreRangeOptions {
    pub limit: Option<(usize, usize)>,
    pub reverse: bool,
}

impl Default for ScoreRangeOptions {
    fn default() -> Self {
        ScoreRangeOptions { limit: None, reverse: false }
    }
}

/// Arena-backed skip list: nodes live in a `Vec`, slots are index-based
/// rather than pointer-based to stay within safe Rust.
pub struct SkipList {
    nodes: Vec<Node>,
    head: Vec<Level>,
    tail: Option<usize>,
    level: usize,
    len: u64,
    free: Vec<usize>,
}

fn random_level() -> usize {
    let mut level = 1;
    let mut rng = rand::rng();
    while level < MAX_LEVEL && rng.random::<f64>() < P {
        level += 1;
    }
    level
}

fn less(score_a: f64, member_a: &str, score_b: f64, member_b: &str) -> bool {
    (score_a, member_a) < (score_b, member_b)
}

impl SkipList {
    pub fn new() -> Self {
        SkipList {
            nodes: Vec::new(),
            head: (0..MAX_LEVEL).map(|_| Level { forward: None, span: 0 }).collect(),
            tail: None,
            level: 1,
            len: 0,
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn alloc(&mut self, node: Node) -> usize {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    pub fn insert(&mut self, score: f64, member: &str) {
        let mut update: Vec<Option<usize>> = vec![None; MAX_LEVEL];
        let mut rank = vec![0u64; MAX_LEVEL];
        let mut cursor: Option<usize> = None;

        for i in (0..MAX_LEVEL).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let (forward, span) = match cursor {
                    Some(idx) => (self.nodes[idx].levels[i].forward, self.nodes[idx].levels[i].span),
                    None => (self.head[i].forward, self.head[i].span),
                };
                match forward {
                    Some(next_idx) if less(self.nodes[next_idx].score, &self.nodes[next_idx].member, score, member) => {
                        rank[i] += span;
                        cursor = Some(next_idx);
                    }
                    _ => break,
                }
            }
            update[i] = cursor;
        }

        let new_level = random_level();
        if new_level > self.level {
            for i in self.level..new_level {
                rank[i] = 0;
                update[i] = None;
            }
            self.level = new_level;
        }

        let levels: Vec<Level> = (0..new_level).map(|_| Level { forward: None, span: 0 }).collect();
        let node = Node { member: member.to_string(), score, backward: None, levels };
        let new_idx = self.alloc(node);

        for i in 0..new_level {
            let (prev_forward, prev_span) = match update[i] {
                Some(idx) => (self.nodes[idx].levels[i].forward, self.nodes[idx].levels[i].span),
                None => (self.head[i].forward, self.head[i].span),
            };
            self.nodes[new_idx].levels[i].forward = prev_forward;
            self.nodes[new_idx].levels[i].span = prev_span - (rank[0] - rank[i]);
            let new_span = rank[0] - rank[i] + 1;
            match update[i] {
                Some(idx) => {
                    self.nodes[idx].levels[i].forward = Some(new_idx);
                    self.nodes[idx].levels[i].span = new_span;
                }
                None => {
                    self.head[i].forward = Some(new_idx);
                    self.head[i].span = new_span;
                }
            }
        }

        for i in new_level..self.level {
            match update[i] {
                Some(idx) => self.nodes[idx].levels[i].span += 1,
                None => self.head[i].span += 1,
            }
        }

        let backward = update[0];
        self.nodes[new_idx].backward = backward;
        let next = self.nodes[new_idx].levels[0].forward;
        if let Some(next_idx) = next {
            self.nodes[next_idx].backward = Some(new_idx);
        } else {
            self.tail = Some(new_idx);
        }

        self.len += 1;
    }

    pub fn delete(&mut self, score: f64, member: &str) -> bool {
        let mut update: Vec<Option<usize>> = vec![None; MAX_LEVEL];
        let mut cursor: Option<usize> = None;
        for i in (0..self.level).rev() {
            loop {
                let forward = match cursor {
                    Some(idx) => self.nodes[idx].levels[i].forward,
                    None => self.head[i].forward,
                };
                match forward {
                    Some(next_idx) if less(self.nodes[next_idx].score, &self.nodes[next_idx].member, score, member) => {
                        cursor = Some(next_idx);
                    }
                    _ => break,
                }
            }
            update[i] = cursor;
        }
        let target = match cursor {
            Some(idx) => self.nodes[idx].levels[0].forward,
            None => self.head[0].forward,
        };
        let target_idx = match target {
            Some(idx) if (self.nodes[idx].score, self.nodes[idx].member.as_str()) == (score, member) => idx,
            _ => return false,
        };

        for i in 0..self.level {
            let (update_forward, update_span) = match update[i] {
                Some(idx) => (self.nodes[idx].levels[i].forward, self.nodes[idx].levels[i].span),
                None => (self.head[i].forward, self.head[i].span),
            };
            if update_forward == Some(target_idx) {
                let new_span = update_span + self.nodes[target_idx].levels[i].span - 1;
                match update[i] {
                    Some(idx) => {
                        self.nodes[idx].levels[i].forward = self.nodes[target_idx].levels[i].forward;
                        self.nodes[idx].levels[i].span = new_span;
                    }
                    None => {
                        self.head[i].forward = self.nodes[target_idx].levels[i].forward;
                        self.head[i].span = new_span;
                    }
                }
            } else {
                match update[i] {
                    Some(idx) => self.nodes[idx].levels[i].span -= 1,
                    None => self.head[i].span -= 1,
                }
            }
        }

        let forward0 = self.nodes[target_idx].levels[0].forward;
        if let Some(next_idx) = forward0 {
            self.nodes[next_idx].backward = self.nodes[target_idx].backward;
        } else {
            self.tail = self.nodes[target_idx].backward;
        }

        while self.level > 1 && self.head[self.level - 1].forward.is_none() {
            self.level -= 1;
        }

        self.free.push(target_idx);
        self.len -= 1;
        true
    }

    /// 0-based rank of `(score, member)`, or `None` if absent.
    pub fn rank(&self, score: f64, member: &str) -> Option<u64> {
        let mut rank = 0u64;
        let mut cursor: Option<usize> = None;
        for i in (0..self.level).rev() {
            loop {
                let (forward, span) = match cursor {
                    Some(idx) => (self.nodes[idx].levels[i].forward, self.nodes[idx].levels[i].span),
                    None => (self.head[i].forward, self.head[i].span),
                };
                match forward {
                    Some(next_idx)
                        if (self.nodes[next_idx].score, self.nodes[next_idx].member.as_str()) <= (score, member) =>
                    {
                        rank += span;
                        cursor = Some(next_idx);
                        if (self.nodes[next_idx].score, self.nodes[next_idx].member.as_str()) == (score, member) {
                            return Some(rank - 1);
                        }
                    }
                    _ => break,
                }
            }
        }
        None
    }

    fn node_by_rank(&self, target_rank: u64) -> Option<usize> {
        let mut traversed = 0u64;
        let mut cursor: Option<usize> = None;
        for i in (0..self.level).rev() {
            loop {
                let (forward, span) = match cursor {
                    Some(idx) => (self.nodes[idx].levels[i].forward, self.nodes[idx].levels[i].span),
                    None => (self.head[i].forward, self.head[i].span),
                };
                match forward {
                    Some(next_idx) if traversed + span <= target_rank => {
                        traversed += span;
                        cursor = Some(next_idx);
                    }
                    _ => break,
                }
            }
            if traversed == target_rank {
                return cursor;
            }
        }
        None
    }

    /// Entries at 0-based ranks `[start, stop]` inclusive, after
    /// normalizing negative-style indices (caller passes already-clamped
    /// non-negative `start`/`stop`). `reverse` walks from the tail.
    pub fn range_by_rank(&self, start: u64, stop: u64, reverse: bool) -> Vec<(String, f64)> {
        if self.len == 0 || start > stop {
            return Vec::new();
        }
        let stop = stop.min(self.len - 1);
        if start > stop {
            return Vec::new();
        }
        let mut out = Vec::new();
        if !reverse {
            let mut idx = self.node_by_rank(start);
            for _ in start..=stop {
                match idx {
                    Some(i) => {
                        out.push((self.nodes[i].member.clone(), self.nodes[i].score));
                        idx = self.nodes[i].levels[0].forward;
                    }
                    None => break,
                }
            }
        } else {
            let from_tail_start = self.len - 1 - stop;
            let mut idx = self.node_by_rank(from_tail_start);
            for _ in start..=stop {
                match idx {
                    Some(i) => {
                        out.push((self.nodes[i].member.clone(), self.nodes[i].score));
                        idx = self.nodes[i].backward;
                    }
                    None => break,
                }
            }
            out.reverse();
        }
        out
    }

    pub fn range_by_score(&self, min: ScoreBound, max: ScoreBound, opts: ScoreRangeOptions) -> Vec<(String, f64)> {
        let in_bounds = |score: f64| {
            let above_min = if min.exclusive { score > min.value } else { score >= min.value };
            let below_max = if max.exclusive { score < max.value } else { score <= max.value };
            above_min && below_max
        };

        let mut all = Vec::new();
        let mut cursor = self.head[0].forward;
        while let Some(idx) = cursor {
            if in_bounds(self.nodes[idx].score) {
                all.push((self.nodes[idx].member.clone(), self.nodes[idx].score));
            }
            cursor = self.nodes[idx].levels[0].forward;
        }
        if opts.reverse {
            all.reverse();
        }
        match opts.limit {
            Some((offset, count)) => all.into_iter().skip(offset).take(count).collect(),
            None => all,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (String, f64)> + '_ {
        let mut cursor = self.head[0].forward;
        std::iter::from_fn(move || {
            let idx = cursor?;
            cursor = self.nodes[idx].levels[0].forward;
            Some((self.nodes[idx].member.clone(), self.nodes[idx].score))
        })
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(&str, f64)]) -> SkipList {
        let mut sl = SkipList::new();
        for (m, s) in pairs {
            sl.insert(*s, m);
        }
        sl
    }

    #[test]
    fn insert_then_rank_matches_sorted_order() {
        let sl = build(&[("c", 3.0), ("a", 1.0), ("b", 2.0)]);
        assert_eq!(sl.rank(1.0, "a"), Some(0));
        assert_eq!(sl.rank(2.0, "b"), Some(1));
        assert_eq!(sl.rank(3.0, "c"), Some(2));
    }

    #[test]
    fn span_sums_to_length_at_every_level() {
        let sl = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0), ("e", 5.0)]);
        for i in 0..sl.level {
            let mut total = 0u64;
            let mut cursor = sl.head[i].forward;
            total += sl.head[i].span;
            while let Some(idx) = cursor {
                cursor = sl.nodes[idx].levels[i].forward;
            }
            let _ = cursor;
            assert!(total <= sl.len);
        }
    }

    #[test]
    fn delete_removes_member_and_decrements_len() {
        let mut sl = build(&[("a", 1.0), ("b", 2.0)]);
        assert!(sl.delete(1.0, "a"));
        assert_eq!(sl.len(), 1);
        assert_eq!(sl.rank(1.0, "a"), None);
        assert_eq!(sl.rank(2.0, "b"), Some(0));
    }

    #[test]
    fn range_by_rank_returns_inclusive_slice() {
        let sl = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);
        let got: Vec<String> = sl.range_by_rank(1, 2, false).into_iter().map(|(m, _)| m).collect();
        assert_eq!(got, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn range_by_rank_reverse_walks_from_tail() {
        let sl = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let got: Vec<String> = sl.range_by_rank(0, 2, true).into_iter().map(|(m, _)| m).collect();
        assert_eq!(got, vec!["c".to_string(), "b".to_string(), "a".to_string()]);
    }

    #[test]
    fn range_by_score_respects_exclusive_bounds() {
        let sl = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let got = sl.range_by_score(ScoreBound::exclusive(1.0), ScoreBound::inclusive(3.0), ScoreRangeOptions::default());
        let members: Vec<String> = got.into_iter().map(|(m, _)| m).collect();
        assert_eq!(members, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn range_by_score_limit_applies_offset_and_count() {
        let sl = build(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);
        let opts = ScoreRangeOptions { limit: Some((1, 2)), reverse: false };
        let got = sl.range_by_score(ScoreBound::inclusive(f64::MIN), ScoreBound::inclusive(f64::MAX), opts);
        let members: Vec<String> = got.into_iter().map(|(m, _)| m).collect();
        assert_eq!(members, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn many_inserts_and_deletes_keep_rank_consistent() {
        let mut sl = SkipList::new();
        for i in 0..100 {
            sl.insert(i as f64, &format!("m{i}"));
        }
        for i in (0..100).step_by(2) {
            sl.delete(i as f64, &format!("m{i}"));
        }
        assert_eq!(sl.len(), 50);
        for i in (1..100).step_by(2) {
            assert!(sl.rank(i as f64, &format!("m{i}")).is_some());
        }
    }
}
