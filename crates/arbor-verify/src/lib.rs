// crates/arbor-verify/src/lib.rs

//! Sound stability verification for tree-based classifiers.
//!
//! Given a trained model and a sample with its classification, the verifier
//! decides whether every point of an adversarial region receives the same
//! label set. A stable verdict is a proof; an unstable verdict carries a
//! concrete witness; unknown means the per-sample budget ran out.
//!
//! Single trees get a complete enumeration-based procedure; ensembles get a
//! best-first refinement over decorators with sound per-label score
//! intervals.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

mod decorator;
mod ensemble;
mod scores;
mod stability;
mod tree;

pub use stability::{AbstractDomain, StabilityAnalysis};
