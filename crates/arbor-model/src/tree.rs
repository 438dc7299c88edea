// crates/arbor-model/src/tree.rs

//! Decision trees over an index arena.
//!
//! Nodes live in a `Vec` addressed by [`NodeId`]; parent links are plain ids,
//! so witness reconstruction can walk leaf-to-root without reference cycles.
//! Trees are immutable once built. All traversals are iterative: ensemble
//! models can be deep enough that recursion is not an option.

use anyhow::{bail, Result};
use arbor_core::{Hyperrectangle, LabelSet};

/// Index of a node inside its tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the arena.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload of a tree node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Leaf carrying per-label training sample counts.
    LeafCounts {
        /// Count per label.
        counts: Vec<u32>,
        /// Sum of `counts`.
        n_samples: u32,
        /// Maximum of `counts`.
        max_count: u32,
    },
    /// Leaf carrying per-label logarithmic scores.
    LeafLogits {
        /// Log-score per label.
        log_scores: Vec<f64>,
        /// Leaf weight.
        weight: f64,
    },
    /// Univariate split `x[feature] ≤ threshold` (left) / `>` (right).
    Split {
        /// Feature index tested by the split.
        feature: u32,
        /// Split threshold.
        threshold: f64,
        /// Child for `x[feature] ≤ threshold`.
        left: NodeId,
        /// Child for `x[feature] > threshold`.
        right: NodeId,
    },
}

impl NodeKind {
    /// Whether this is a leaf of either flavor.
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Self::Split { .. })
    }
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
}

/// Incremental arena builder; nodes are created bottom-up so every split
/// receives already-existing children.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    /// Fresh builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("tree too large"));
        self.nodes.push(Node { kind, parent: None });
        id
    }

    /// Add a count leaf; `n_samples` and `max_count` are derived.
    pub fn leaf_counts(&mut self, counts: Vec<u32>) -> NodeId {
        let n_samples = counts.iter().sum();
        let max_count = counts.iter().copied().max().unwrap_or(0);
        self.push(NodeKind::LeafCounts {
            counts,
            n_samples,
            max_count,
        })
    }

    /// Add a logarithmic leaf.
    pub fn leaf_logits(&mut self, log_scores: Vec<f64>, weight: f64) -> NodeId {
        self.push(NodeKind::LeafLogits { log_scores, weight })
    }

    /// Add a split over existing children, wiring their parent links.
    pub fn split(&mut self, feature: u32, threshold: f64, left: NodeId, right: NodeId) -> NodeId {
        let id = self.push(NodeKind::Split {
            feature,
            threshold,
            left,
            right,
        });
        self.nodes[left.index()].parent = Some(id);
        self.nodes[right.index()].parent = Some(id);
        id
    }

    /// Finish the tree.
    ///
    /// # Errors
    /// Fails when the arena is inconsistent: a non-root node without a
    /// parent (disconnected), a leaf whose arity differs from the label
    /// alphabet, or a split feature outside the feature space.
    pub fn build(self, root: NodeId, n_features: u32, labels: Vec<String>) -> Result<DecisionTree> {
        let n_labels = labels.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match &node.kind {
                NodeKind::LeafCounts { counts, .. } if counts.len() != n_labels => {
                    bail!("leaf has {} counts, expected {n_labels}", counts.len())
                }
                NodeKind::LeafLogits { log_scores, .. } if log_scores.len() != n_labels => {
                    bail!("leaf has {} scores, expected {n_labels}", log_scores.len())
                }
                NodeKind::Split { feature, .. } if *feature >= n_features => {
                    bail!("split on feature {feature} outside space of size {n_features}")
                }
                _ => {}
            }
            if node.parent.is_none() && i != root.index() {
                bail!("node {i} is disconnected from the root");
            }
        }
        if self.nodes[root.index()].parent.is_some() {
            bail!("designated root has a parent");
        }
        Ok(DecisionTree {
            nodes: self.nodes,
            root,
            n_features,
            labels,
        })
    }
}

/// Immutable decision tree.
#[derive(Clone, Debug)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    root: NodeId,
    n_features: u32,
    labels: Vec<String>,
}

impl DecisionTree {
    /// Root node id.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Feature-space dimension.
    #[inline]
    #[must_use]
    pub fn n_features(&self) -> u32 {
        self.n_features
    }

    /// Label alphabet.
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Alphabet size.
    #[inline]
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    /// Payload of `id`.
    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Parent of `id`, `None` at the root.
    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// Depth of `id` (root = 0), by walking parent links.
    #[must_use]
    pub fn node_depth(&self, id: NodeId) -> u32 {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
            depth += 1;
        }
        depth
    }

    /// Leaf reached by descending with `x` (ties on the threshold go left,
    /// matching the `≤` convention of the split).
    #[must_use]
    pub fn descend(&self, x: &[f64]) -> NodeId {
        let mut current = self.root;
        loop {
            match self.kind(current) {
                NodeKind::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if x[*feature as usize] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                _ => return current,
            }
        }
    }

    /// Per-label decision scores of `x`: count leaves yield empirical
    /// probabilities, logarithmic leaves yield their raw log-scores.
    pub fn decision_function(&self, x: &[f64], scores: &mut [f64]) {
        let leaf = self.descend(x);
        match self.kind(leaf) {
            NodeKind::LeafCounts {
                counts, n_samples, ..
            } => {
                for (s, &c) in scores.iter_mut().zip(counts) {
                    *s = f64::from(c) / f64::from(*n_samples);
                }
            }
            NodeKind::LeafLogits { log_scores, .. } => {
                scores.copy_from_slice(log_scores);
            }
            NodeKind::Split { .. } => unreachable!("descend stops at leaves"),
        }
    }

    /// Concrete classification: labels tied at the maximal decision score.
    #[must_use]
    pub fn classify(&self, x: &[f64]) -> LabelSet {
        let mut scores = vec![0.0; self.n_labels()];
        self.decision_function(x, &mut scores);
        argmax_set(&scores)
    }

    /// Labels tied at the maximal count/log-score of leaf `id`.
    ///
    /// # Panics
    /// Panics if `id` is a split node.
    #[must_use]
    pub fn leaf_labels(&self, id: NodeId) -> LabelSet {
        match self.kind(id) {
            NodeKind::LeafCounts {
                counts, max_count, ..
            } => {
                let mut set = LabelSet::empty(self.n_labels());
                for (i, &c) in counts.iter().enumerate() {
                    if c == *max_count {
                        set.insert(i);
                    }
                }
                set
            }
            NodeKind::LeafLogits { log_scores, .. } => argmax_set(log_scores),
            NodeKind::Split { .. } => panic!("leaf_labels called on a split node"),
        }
    }

    /// Collect leaves reachable from the root inside `region` into `out`.
    ///
    /// At a split `⟨i, k⟩` the left child is reachable iff `region[i].lo ≤ k`
    /// and the right child iff `region[i].hi > k`; both may hold. `stack` is
    /// caller-provided scratch so repeated enumeration reuses its capacity.
    pub fn reachable_leaves(
        &self,
        region: &Hyperrectangle,
        stack: &mut Vec<NodeId>,
        out: &mut Vec<NodeId>,
    ) {
        stack.clear();
        out.clear();
        stack.push(self.root);
        while let Some(id) = stack.pop() {
            match self.kind(id) {
                NodeKind::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let iv = &region.intervals()[*feature as usize];
                    if iv.lo <= *threshold {
                        stack.push(*left);
                    }
                    if iv.hi > *threshold {
                        stack.push(*right);
                    }
                }
                _ => out.push(id),
            }
        }
    }
}

/// Index set of the maximal entries of `scores`.
#[must_use]
pub fn argmax_set(scores: &[f64]) -> LabelSet {
    let mut set = LabelSet::empty(scores.len());
    let mut max = f64::NEG_INFINITY;
    for &s in scores {
        if s > max {
            max = s;
        }
    }
    for (i, &s) in scores.iter().enumerate() {
        if s == max {
            set.insert(i);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::Interval;

    fn labels2() -> Vec<String> {
        vec!["a".to_owned(), "b".to_owned()]
    }

    /// Single split on x0 at 0.5; left votes label 0, right votes label 1.
    fn stump() -> DecisionTree {
        let mut b = TreeBuilder::new();
        let left = b.leaf_counts(vec![10, 0]);
        let right = b.leaf_counts(vec![0, 10]);
        let root = b.split(0, 0.5, left, right);
        b.build(root, 1, labels2()).unwrap()
    }

    #[test]
    fn classification_follows_the_split() {
        let t = stump();
        assert!(t.classify(&[0.0]).contains(0));
        assert!(t.classify(&[0.5]).contains(0)); // threshold goes left
        assert!(t.classify(&[0.6]).contains(1));
    }

    #[test]
    fn ties_produce_multiple_labels() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf_counts(vec![5, 5]);
        let t = b.build(leaf, 1, labels2()).unwrap();
        let set = t.classify(&[0.0]);
        assert_eq!(set.cardinality(), 2);
    }

    #[test]
    fn reachable_leaves_depend_on_the_region() {
        let t = stump();
        let mut stack = Vec::new();
        let mut out = Vec::new();

        let narrow = Hyperrectangle::new(vec![Interval::new(0.0, 0.4)]);
        t.reachable_leaves(&narrow, &mut stack, &mut out);
        assert_eq!(out.len(), 1);

        let wide = Hyperrectangle::new(vec![Interval::new(0.0, 1.0)]);
        t.reachable_leaves(&wide, &mut stack, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn builder_rejects_arity_mismatch() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf_counts(vec![1, 2, 3]);
        assert!(b.build(leaf, 1, labels2()).is_err());
    }

    #[test]
    fn node_depth_counts_parent_links() {
        let t = stump();
        assert_eq!(t.node_depth(t.root()), 0);
        if let NodeKind::Split { left, .. } = t.kind(t.root()) {
            assert_eq!(t.node_depth(*left), 1);
        } else {
            panic!("stump root must be a split");
        }
    }
}
