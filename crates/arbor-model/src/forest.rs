// crates/arbor-model/src/forest.rs

//! Forests: ordered tree ensembles with a voting scheme.

use crate::tree::{argmax_set, DecisionTree};
use anyhow::{bail, Result};
use arbor_core::LabelSet;
use serde::{Deserialize, Serialize};

/// Aggregation rule turning per-tree outputs into ensemble scores.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum VotingScheme {
    /// One vote per tree to each of its argmax labels.
    Max,
    /// Average of per-tree empirical probabilities.
    Average,
    /// Softargmax over summed per-tree logits.
    Softargmax,
}

/// Ordered collection of trees sharing one feature space and label alphabet.
#[derive(Clone, Debug)]
pub struct Forest {
    trees: Vec<DecisionTree>,
    voting: VotingScheme,
}

impl Forest {
    /// Build a forest, validating model consistency.
    ///
    /// # Errors
    /// Fails on an empty tree list or when trees disagree on the feature
    /// dimension or the label alphabet.
    pub fn new(trees: Vec<DecisionTree>, voting: VotingScheme) -> Result<Self> {
        let Some(first) = trees.first() else {
            bail!("a forest needs at least one tree");
        };
        for (i, tree) in trees.iter().enumerate().skip(1) {
            if tree.n_features() != first.n_features() {
                bail!(
                    "tree {i} has feature space {} but tree 0 has {}",
                    tree.n_features(),
                    first.n_features()
                );
            }
            if tree.labels() != first.labels() {
                bail!("tree {i} disagrees with tree 0 on the label alphabet");
            }
        }
        Ok(Self { trees, voting })
    }

    /// Trees in ensemble order.
    #[inline]
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Number of trees.
    #[inline]
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Active voting scheme.
    #[inline]
    #[must_use]
    pub fn voting(&self) -> VotingScheme {
        self.voting
    }

    /// Override the voting scheme (loaders default to max).
    pub fn set_voting(&mut self, voting: VotingScheme) {
        self.voting = voting;
    }

    /// Feature-space dimension.
    #[inline]
    #[must_use]
    pub fn n_features(&self) -> u32 {
        self.trees[0].n_features()
    }

    /// Shared label alphabet.
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[String] {
        self.trees[0].labels()
    }

    /// Alphabet size.
    #[inline]
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.trees[0].n_labels()
    }

    /// Per-label ensemble scores of `x` under the active voting scheme.
    pub fn decision_function(&self, x: &[f64], scores: &mut [f64]) {
        let n_labels = self.n_labels();
        let mut tree_scores = vec![0.0; n_labels];
        scores.fill(0.0);

        for tree in &self.trees {
            tree.decision_function(x, &mut tree_scores);
            match self.voting {
                VotingScheme::Max => {
                    let max = tree_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    for (s, &t) in scores.iter_mut().zip(&tree_scores) {
                        if t == max {
                            *s += 1.0;
                        }
                    }
                }
                VotingScheme::Average => {
                    let n = self.trees.len() as f64;
                    for (s, &t) in scores.iter_mut().zip(&tree_scores) {
                        *s += t / n;
                    }
                }
                VotingScheme::Softargmax => {
                    for (s, &t) in scores.iter_mut().zip(&tree_scores) {
                        *s += t;
                    }
                }
            }
        }

        // The argmax is invariant under the softargmax normalization, but the
        // scores themselves are part of the decision-function contract.
        if self.voting == VotingScheme::Softargmax {
            let total: f64 = scores.iter().map(|&s| s.exp()).sum();
            for s in scores.iter_mut() {
                *s = s.exp() / total;
            }
        }
    }

    /// Concrete classification: labels tied at the maximal ensemble score.
    #[must_use]
    pub fn classify(&self, x: &[f64]) -> LabelSet {
        let mut scores = vec![0.0; self.n_labels()];
        self.decision_function(x, &mut scores);
        argmax_set(&scores)
    }
}
