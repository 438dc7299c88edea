// crates/arbor-model/src/classifier.rs

//! Classifier dispatch: a single tree or a forest behind one surface.

use crate::forest::{Forest, VotingScheme};
use crate::tree::DecisionTree;
use arbor_core::LabelSet;

/// A trained tree-based classifier.
#[derive(Clone, Debug)]
pub enum Classifier {
    /// Single decision tree.
    Tree(DecisionTree),
    /// Tree ensemble.
    Forest(Forest),
}

impl Classifier {
    /// Feature-space dimension.
    #[must_use]
    pub fn n_features(&self) -> u32 {
        match self {
            Self::Tree(t) => t.n_features(),
            Self::Forest(f) => f.n_features(),
        }
    }

    /// Label alphabet.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        match self {
            Self::Tree(t) => t.labels(),
            Self::Forest(f) => f.labels(),
        }
    }

    /// Alphabet size.
    #[must_use]
    pub fn n_labels(&self) -> usize {
        self.labels().len()
    }

    /// Concrete classification of `x`.
    #[must_use]
    pub fn classify(&self, x: &[f64]) -> LabelSet {
        match self {
            Self::Tree(t) => t.classify(x),
            Self::Forest(f) => f.classify(x),
        }
    }

    /// Override the voting scheme; no effect on single trees.
    pub fn set_voting(&mut self, voting: VotingScheme) {
        if let Self::Forest(f) = self {
            f.set_voting(voting);
        }
    }
}
