//! Adaptive set: starts as a sorted integer array, promotes one-way to a
//! hash set once a non-integer member is added or the array hits its size
//! bound.

pub mod hashset;
pub mod intset;

use ahash::AHashSet;
use rand::seq::IteratorRandom;

use self::hashset::HashSetContainer;
use self::intset::IntSet;
use crate::value::Scalar;

#[derive(Debug)]
enum Repr {
    Int(IntSet),
    Hash(HashSetContainer),
}

#[derive(Debug)]
pub struct SetObject {
    repr: Repr,
    max_intset_length: usize,
}

impl SetObject {
    pub fn new(max_intset_length: usize) -> Self {
        SetObject { repr: Repr::Int(IntSet::new()), max_intset_length }
    }

    fn promote(&mut self) {
        if let Repr::Int(int_set) = &self.repr {
            let mut hash = HashSetContainer::new();
            for v in int_set.members() {
                hash.add(Scalar::Int(*v));
            }
            self.repr = Repr::Hash(hash);
        }
    }

    pub fn add(&mut self, value: Scalar) -> bool {
        match (&mut self.repr, &value) {
            (Repr::Int(int_set), Scalar::Int(i))
                if int_set.contains(*i) || int_set.len() < self.max_intset_length =>
            {
                int_set.add(*i)
            }
            (Repr::Int(_), _) => {
                self.promote();
                self.add(value)
            }
            (Repr::Hash(hash), _) => hash.add(value),
        }
    }

    pub fn remove(&mut self, value: &Scalar) -> bool {
        match &mut self.repr {
            Repr::Int(int_set) => match value.as_int() {
                Some(i) => int_set.remove(i),
                None => false,
            },
            Repr::Hash(hash) => hash.remove(value),
        }
    }

    pub fn contains(&self, value: &Scalar) -> bool {
        match &self.repr {
            Repr::Int(int_set) => value.as_int().is_some_and(|i| int_set.contains(i)),
            Repr::Hash(hash) => hash.contains(value),
        }
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Int(int_set) => int_set.len(),
            Repr::Hash(hash) => hash.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn members(&self) -> Vec<Scalar> {
        match &self.repr {
            Repr::Int(int_set) => int_set.members().iter().map(|v| Scalar::Int(*v)).collect(),
            Repr::Hash(hash) => hash.iter().cloned().collect(),
        }
    }

    pub fn random_members(&self, count: usize) -> Vec<Scalar> {
        let members = self.members();
        let mut rng = rand::rng();
        members.into_iter().choose_multiple(&mut rng, count)
    }

    pub fn pop(&mut self, count: usize) -> Vec<Scalar> {
        let picked = self.random_members(count);
        for m in &picked {
            self.remove(m);
        }
        picked
    }
}

fn estimated_cost(sets: &[&SetObject]) -> (usize, usize) {
    let product: usize = sets.iter().map(|s| s.len()).product();
    let sum: usize = sets.iter().map(|s| s.len()).sum();
    (product, sum)
}

/// Members in `target` absent from every set in `others`.
///
/// Chooses between two strategies by a cost heuristic: scanning
/// `target`'s members against each `other` (method 1) is cheap when
/// `target` is small relative to the others; materializing `target` into
/// a working set and deleting anything seen in any `other` (method 2)
/// wins when `target` is large and the others are collectively larger
/// still.
pub fn diff(target: &SetObject, others: &[&SetObject]) -> Vec<Scalar> {
    if others.is_empty() {
        return target.members();
    }
    let (product, sum) = estimated_cost(&[&[target][..], others].concat());
    let use_method_two = (product as f64) > (sum + target.len()) as f64;
    if !use_method_two {
        target
            .members()
            .into_iter()
            .filter(|m| !others.iter().any(|o| o.contains(m)))
            .collect()
    } else {
        let mut working: AHashSet<Scalar> = target.members().into_iter().collect();
        for other in others {
            for m in other.members() {
                working.remove(&m);
            }
        }
        working.into_iter().collect()
    }
}

/// Members present in every input set. Iterates the smallest set first.
pub fn inter(sets: &[&SetObject]) -> Vec<Scalar> {
    if sets.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<&&SetObject> = sets.iter().collect();
    sorted.sort_by_key(|s| s.len());
    let (smallest, rest) = sorted.split_first().unwrap();
    smallest
        .members()
        .into_iter()
        .filter(|m| rest.iter().all(|s| s.contains(m)))
        .collect()
}

/// Distinct members across every input set.
pub fn union(sets: &[&SetObject]) -> Vec<Scalar> {
    let mut seen: AHashSet<Scalar> = AHashSet::new();
    for s in sets {
        for m in s.members() {
            seen.insert(m);
        }
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_from_ints(values: &[i64]) -> SetObject {
        let mut s = SetObject::new(512);
        for v in values {
            s.add(Scalar::Int(*v));
        }
        s
    }

    #[test]
    fn starts_as_intset_and_accepts_integers() {
        let mut s = SetObject::new(512);
        assert!(s.add(Scalar::Int(1)));
        assert!(matches!(s.repr, Repr::Int(_)));
    }

    #[test]
    fn promotes_on_non_integer_member() {
        let mut s = SetObject::new(512);
        s.add(Scalar::Int(1));
        s.add(Scalar::from("hello"));
        assert!(matches!(s.repr, Repr::Hash(_)));
        assert!(s.contains(&Scalar::Int(1)));
        assert!(s.contains(&Scalar::from("hello")));
    }

    #[test]
    fn promotes_once_intset_bound_reached() {
        let mut s = SetObject::new(4);
        for i in 0..4 {
            s.add(Scalar::Int(i));
        }
        assert!(matches!(s.repr, Repr::Int(_)));
        s.add(Scalar::Int(100));
        assert!(matches!(s.repr, Repr::Hash(_)));
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn diff_excludes_members_in_others() {
        let a = set_from_ints(&[1, 2, 3]);
        let b = set_from_ints(&[2]);
        let mut result = diff(&a, &[&b]);
        result.sort();
        assert_eq!(result, vec![Scalar::Int(1), Scalar::Int(3)]);
    }

    #[test]
    fn diff_with_no_others_returns_target() {
        let a = set_from_ints(&[1, 2]);
        let mut result = diff(&a, &[]);
        result.sort();
        assert_eq!(result, vec![Scalar::Int(1), Scalar::Int(2)]);
    }

    #[test]
    fn inter_returns_common_members() {
        let a = set_from_ints(&[1, 2, 3]);
        let b = set_from_ints(&[2, 3, 4]);
        let mut result = inter(&[&a, &b]);
        result.sort();
        assert_eq!(result, vec![Scalar::Int(2), Scalar::Int(3)]);
    }

    #[test]
    fn union_dedupes_across_sets() {
        let a = set_from_ints(&[1, 2]);
        let b = set_from_ints(&[2, 3]);
        let mut result = union(&[&a, &b]);
        result.sort();
        assert_eq!(result, vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]);
    }

    #[test]
    fn pop_removes_returned_members() {
        let mut s = set_from_ints(&[1, 2, 3]);
        let popped = s.pop(2);
        assert_eq!(popped.len(), 2);
        assert_eq!(s.len(), 1);
        for m in &popped {
            assert!(!s.contains(m));
        }
    }
}
