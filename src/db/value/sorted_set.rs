use bytes::Bytes;
use hashbrown::HashMap;
use ordered_float::NotNan;
use std::collections::BTreeSet;

/// A score range limit, either inclusive or exclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoreBound {
    Inclusive(f64),
    Exclusive(f64),
}

impl ScoreBound {
    fn admits_min(self, score: f64) -> bool {
        match self {
            ScoreBound::Inclusive(min) => score >= min,
            ScoreBound::Exclusive(min) => score > min,
        }
    }

    fn admits_max(self, score: f64) -> bool {
        match self {
            ScoreBound::Inclusive(max) => score <= max,
            ScoreBound::Exclusive(max) => score < max,
        }
    }
}

/// A sorted set value. Members are ordered by `(score, member)` in a tree,
/// with a secondary index by member for O(log n) score lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SortedSet {
    ordered: BTreeSet<(NotNan<f64>, Bytes)>,
    scores: HashMap<Bytes, NotNan<f64>>,
}

impl SortedSet {
    /// Insert or update a member, returning `true` when it's newly added.
    pub fn insert(&mut self, member: Bytes, score: NotNan<f64>) -> bool {
        match self.scores.insert(member.clone(), score) {
            Some(previous) => {
                self.ordered.remove(&(previous, member.clone()));
                self.ordered.insert((score, member));
                false
            }
            None => {
                self.ordered.insert((score, member));
                true
            }
        }
    }

    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered
                    .remove(&(score, Bytes::copy_from_slice(member)));
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &[u8]) -> Option<NotNan<f64>> {
        self.scores.get(member).copied()
    }

    /// Add `by` to a member's score, creating it at `by` when missing.
    /// Returns `None` when the result would be NaN.
    pub fn increment(&mut self, member: Bytes, by: f64) -> Option<NotNan<f64>> {
        let current = self.score(&member).map_or(0.0, NotNan::into_inner);
        let score = NotNan::new(current + by).ok()?;
        self.insert(member, score);
        Some(score)
    }

    /// The position of a member in `(score, member)` order.
    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        let score = self.score(member)?;
        let position = self
            .ordered
            .iter()
            .position(|(s, m)| *s == score && m == member);
        debug_assert!(position.is_some());
        position
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterate members in ascending `(score, member)` order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&Bytes, NotNan<f64>)> {
        self.ordered.iter().map(|(score, member)| (member, *score))
    }

    /// Iterate members whose scores fall inside the given bounds.
    pub fn range_by_score(
        &self,
        min: ScoreBound,
        max: ScoreBound,
    ) -> impl Iterator<Item = (&Bytes, NotNan<f64>)> {
        self.iter()
            .skip_while(move |(_, score)| !min.admits_min(score.into_inner()))
            .take_while(move |(_, score)| max.admits_max(score.into_inner()))
    }

    pub fn count(&self, min: ScoreBound, max: ScoreBound) -> usize {
        self.range_by_score(min, max).count()
    }

    /// Remove all members inside the score bounds, returning how many.
    pub fn remove_range_by_score(&mut self, min: ScoreBound, max: ScoreBound) -> usize {
        let doomed: Vec<Bytes> = self
            .range_by_score(min, max)
            .map(|(member, _)| member.clone())
            .collect();
        for member in &doomed {
            self.remove(member);
        }
        doomed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(value: f64) -> NotNan<f64> {
        NotNan::new(value).unwrap()
    }

    fn sample() -> SortedSet {
        let mut set = SortedSet::default();
        set.insert("c".into(), score(3.0));
        set.insert("a".into(), score(1.0));
        set.insert("b".into(), score(2.0));
        set
    }

    #[test]
    fn ordering() {
        let set = sample();
        let members: Vec<_> = set.iter().map(|(m, _)| m.clone()).collect();
        assert_eq!(members, vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
    }

    #[test]
    fn ties_break_on_member() {
        let mut set = SortedSet::default();
        set.insert("b".into(), score(1.0));
        set.insert("a".into(), score(1.0));
        let members: Vec<_> = set.iter().map(|(m, _)| m.clone()).collect();
        assert_eq!(members, vec![Bytes::from("a"), Bytes::from("b")]);
    }

    #[test]
    fn update_moves_member() {
        let mut set = sample();
        assert!(!set.insert("a".into(), score(9.0)));
        assert_eq!(set.rank(b"a"), Some(2));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn rank() {
        let set = sample();
        assert_eq!(set.rank(b"a"), Some(0));
        assert_eq!(set.rank(b"c"), Some(2));
        assert_eq!(set.rank(b"x"), None);
    }

    #[test]
    fn increment() {
        let mut set = sample();
        assert_eq!(set.increment("a".into(), 5.0), Some(score(6.0)));
        assert_eq!(set.increment("new".into(), 2.5), Some(score(2.5)));
        assert_eq!(
            set.increment("a".into(), f64::NEG_INFINITY),
            Some(score(f64::NEG_INFINITY))
        );
    }

    #[test]
    fn score_ranges() {
        let set = sample();
        use ScoreBound::*;
        assert_eq!(set.count(Inclusive(1.0), Inclusive(2.0)), 2);
        assert_eq!(set.count(Exclusive(1.0), Inclusive(3.0)), 2);
        assert_eq!(set.count(Inclusive(f64::NEG_INFINITY), Inclusive(f64::INFINITY)), 3);
    }

    #[test]
    fn remove_range() {
        let mut set = sample();
        use ScoreBound::*;
        assert_eq!(set.remove_range_by_score(Inclusive(2.0), Inclusive(3.0)), 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rank(b"a"), Some(0));
    }
}
