// crates/arbor-core/src/hyperrectangle.rs

//! Hyperrectangle abstract domain: an axis-aligned box in `ℝⁿ`, stored as one
//! interval per dimension. A box is bottom iff any component is bottom.
//!
//! Boxes are exclusively owned by their holder; the verifier clones on split
//! and releases eagerly, so there is no sharing to reason about.

use crate::interval::Interval;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned box as an ordered sequence of intervals.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Hyperrectangle {
    intervals: Vec<Interval>,
}

impl Hyperrectangle {
    /// Box from explicit component intervals.
    #[must_use]
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self { intervals }
    }

    /// The full space `ℝⁿ` (every component `[-∞, +∞]`).
    #[must_use]
    pub fn top(n: usize) -> Self {
        Self {
            intervals: vec![Interval::new(f64::NEG_INFINITY, f64::INFINITY); n],
        }
    }

    /// Dimension of the underlying space.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.intervals.len()
    }

    /// Component intervals, in order.
    #[inline]
    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Mutable component intervals.
    #[inline]
    pub fn intervals_mut(&mut self) -> &mut [Interval] {
        &mut self.intervals
    }

    /// Whether the box denotes the empty set.
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.intervals.iter().any(Interval::is_bottom)
    }

    /// Center point of the box.
    #[must_use]
    pub fn midpoint(&self) -> Vec<f64> {
        self.intervals.iter().map(Interval::midpoint).collect()
    }

    /// Per-dimension half-widths.
    #[must_use]
    pub fn radius(&self) -> Vec<f64> {
        self.intervals.iter().map(Interval::radius).collect()
    }

    /// Generalized volume: the product of per-dimension radii.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.intervals.iter().map(Interval::radius).product()
    }

    /// Uniformly sampled point of the box.
    #[must_use]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.intervals.iter().map(|iv| iv.sample(rng)).collect()
    }

    /// Whether `point` lies inside the box. Dimension mismatch is `false`.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dim()
            && self
                .intervals
                .iter()
                .zip(point)
                .all(|(iv, &x)| iv.contains(x))
    }

    /// Componentwise intersection.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        Self {
            intervals: self
                .intervals
                .iter()
                .zip(&other.intervals)
                .map(|(a, b)| a.meet(b))
                .collect(),
        }
    }

    /// Componentwise interval hull.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            intervals: self
                .intervals
                .iter()
                .zip(&other.intervals)
                .map(|(a, b)| a.join(b))
                .collect(),
        }
    }
}

impl fmt::Display for Hyperrectangle {
    /// Space-separated `[l;u]` components, the counterexample-dump format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for iv in &self.intervals {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{iv}")?;
            first = false;
        }
        Ok(())
    }
}
