// crates/arbor-model/src/lib.rs

//! Tree-based classifier models for the arbor verifier: arena-backed
//! decision trees, forests with a voting scheme, and the silva text-format
//! loader.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

pub mod classifier;
pub mod forest;
pub mod graphviz;
pub mod silva;
pub mod tree;

// ---- Re-exports for workspace compatibility ----
pub use classifier::Classifier;
pub use forest::{Forest, VotingScheme};
pub use graphviz::write_tree_dot;
pub use silva::{parse_classifier, read_classifier};
pub use tree::{argmax_set, DecisionTree, NodeId, NodeKind, TreeBuilder};
