// crates/arbor-core/src/lib.rs

//! Core abstract domains and region types for the arbor verifier.
//!
//! Everything downstream builds on these pieces: outward-rounded interval
//! arithmetic, hyperrectangles, label-index sets, perturbations lowered to
//! boxes, categorical tiers, and the per-sample stability status.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

pub mod hyperrectangle;
pub mod interval;
pub mod labels;
pub mod perturbation;
pub mod status;
pub mod tier;

// ---- Re-exports for workspace compatibility ----
pub use hyperrectangle::Hyperrectangle;
pub use interval::Interval;
pub use labels::LabelSet;
pub use perturbation::{AdversarialRegion, Perturbation};
pub use status::{StabilityStatus, Verdict};
pub use tier::Tier;
