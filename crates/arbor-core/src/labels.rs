// crates/arbor-core/src/labels.rs

//! Sets of label indices.
//!
//! Classification results are sets of small integers indexing a model's label
//! table; string labels only exist at the I/O boundary. The set is a plain
//! bitmask, sized at construction for the label alphabet.

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Bitmask set over label indices `0..n_labels`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelSet {
    words: Vec<u64>,
    n_labels: usize,
}

impl LabelSet {
    /// Empty set over an alphabet of `n_labels` labels.
    #[must_use]
    pub fn empty(n_labels: usize) -> Self {
        Self {
            words: vec![0; n_labels.div_ceil(WORD_BITS)],
            n_labels,
        }
    }

    /// Size of the label alphabet (not the cardinality).
    #[inline]
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.n_labels
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Insert label `i`.
    ///
    /// # Panics
    /// Panics if `i` is outside the alphabet.
    pub fn insert(&mut self, i: usize) {
        assert!(i < self.n_labels, "label index {i} out of range");
        self.words[i / WORD_BITS] |= 1u64 << (i % WORD_BITS);
    }

    /// Whether label `i` is in the set.
    #[inline]
    #[must_use]
    pub fn contains(&self, i: usize) -> bool {
        i < self.n_labels && self.words[i / WORD_BITS] & (1u64 << (i % WORD_BITS)) != 0
    }

    /// Number of elements.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether the set has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Whether the set has exactly one element.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.cardinality() == 1
    }

    /// Whether the two sets share no element.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(a, b)| a & b == 0)
    }

    /// Cardinality of the intersection.
    #[must_use]
    pub fn intersection_cardinality(&self, other: &Self) -> usize {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// Iterate over the contained indices in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_labels).filter(|&i| self.contains(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_contains_cardinality() {
        let mut s = LabelSet::empty(70);
        assert!(s.is_empty());
        s.insert(0);
        s.insert(69);
        assert!(s.contains(0) && s.contains(69) && !s.contains(1));
        assert_eq!(s.cardinality(), 2);
        assert!(!s.is_singleton());
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![0, 69]);
    }

    #[test]
    fn disjoint_and_intersection() {
        let mut a = LabelSet::empty(8);
        let mut b = LabelSet::empty(8);
        a.insert(1);
        a.insert(3);
        b.insert(3);
        b.insert(5);
        assert!(!a.is_disjoint(&b));
        assert_eq!(a.intersection_cardinality(&b), 1);
        let mut c = LabelSet::empty(8);
        c.insert(0);
        assert!(a.is_disjoint(&c));
    }

    #[test]
    fn equality_is_structural() {
        let mut a = LabelSet::empty(4);
        let mut b = LabelSet::empty(4);
        a.insert(2);
        b.insert(2);
        assert_eq!(a, b);
        b.insert(0);
        assert_ne!(a, b);
    }
}
