// crates/arbor-core/src/perturbation.rs

//! Perturbations and adversarial regions.
//!
//! A perturbation describes how a sample may be displaced by an adversary; an
//! adversarial region pairs a concrete sample with one. Regions are lowered
//! to a [`Hyperrectangle`] before analysis. Lowering is a pure function of
//! (sample, perturbation), so repeating it yields identical boxes.

use crate::hyperrectangle::Hyperrectangle;
use crate::interval::Interval;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Adversarial displacement model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Perturbation {
    /// `ℓ∞` ball of radius `epsilon` around the sample.
    LInf {
        /// Ball radius.
        epsilon: f64,
    },
    /// `ℓ∞` ball clipped to `[min, max]` on every dimension. Clipping may
    /// empty a component, in which case the lowered box is bottom.
    LInfClipAll {
        /// Ball radius.
        epsilon: f64,
        /// Lower clip bound.
        min: f64,
        /// Upper clip bound.
        max: f64,
    },
    /// Explicit per-dimension intervals, independent of the sample.
    Explicit(Hyperrectangle),
}

impl Perturbation {
    /// Parse an explicit region from a file of whitespace-separated `[l;u]`
    /// pairs, one per dimension.
    ///
    /// # Errors
    /// Fails on unreadable files or malformed interval tokens.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read perturbation file {}", path.display()))?;

        let mut intervals = Vec::new();
        for (idx, token) in text.split_whitespace().enumerate() {
            intervals.push(
                parse_interval(token)
                    .with_context(|| format!("perturbation interval #{idx} in {}", path.display()))?,
            );
        }
        if intervals.is_empty() {
            bail!("perturbation file {} contains no intervals", path.display());
        }
        Ok(Self::Explicit(Hyperrectangle::new(intervals)))
    }
}

/// Parse a single `[l;u]` token.
fn parse_interval(token: &str) -> Result<Interval> {
    let inner = token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .with_context(|| format!("expected [l;u], got {token:?}"))?;
    let (lo, hi) = inner
        .split_once(';')
        .with_context(|| format!("expected [l;u], got {token:?}"))?;
    let lo: f64 = lo
        .trim()
        .parse()
        .with_context(|| format!("invalid lower bound in {token:?}"))?;
    let hi: f64 = hi
        .trim()
        .parse()
        .with_context(|| format!("invalid upper bound in {token:?}"))?;
    Ok(Interval::new(lo, hi))
}

/// A sample together with the perturbation acting on it.
#[derive(Clone, Debug)]
pub struct AdversarialRegion<'a> {
    /// Originator of the region.
    pub sample: &'a [f64],
    /// Displacement model.
    pub perturbation: &'a Perturbation,
}

impl AdversarialRegion<'_> {
    /// Lower the region to its box semantics.
    #[must_use]
    pub fn to_hyperrectangle(&self) -> Hyperrectangle {
        match self.perturbation {
            Perturbation::LInf { epsilon } => Hyperrectangle::new(
                self.sample
                    .iter()
                    .map(|&x| Interval::new(x - epsilon, x + epsilon))
                    .collect(),
            ),
            Perturbation::LInfClipAll { epsilon, min, max } => Hyperrectangle::new(
                self.sample
                    .iter()
                    .map(|&x| Interval::new((x - epsilon).max(*min), (x + epsilon).min(*max)))
                    .collect(),
            ),
            Perturbation::Explicit(region) => region.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l_inf_lowering() {
        let p = Perturbation::LInf { epsilon: 0.5 };
        let region = AdversarialRegion {
            sample: &[0.0, 2.0],
            perturbation: &p,
        };
        let h = region.to_hyperrectangle();
        assert_eq!(h.intervals()[0], Interval::new(-0.5, 0.5));
        assert_eq!(h.intervals()[1], Interval::new(1.5, 2.5));
    }

    #[test]
    fn lowering_is_idempotent() {
        let p = Perturbation::LInfClipAll {
            epsilon: 0.25,
            min: 0.0,
            max: 1.0,
        };
        let region = AdversarialRegion {
            sample: &[0.1, 0.9],
            perturbation: &p,
        };
        let a = region.to_hyperrectangle();
        let b = region.to_hyperrectangle();
        assert_eq!(a, b);
        assert_eq!(a.meet(&a), a);
    }

    #[test]
    fn clipping_can_empty_the_box() {
        // Sample far outside the clip window on dimension 0.
        let p = Perturbation::LInfClipAll {
            epsilon: 0.1,
            min: 0.0,
            max: 1.0,
        };
        let region = AdversarialRegion {
            sample: &[5.0],
            perturbation: &p,
        };
        assert!(region.to_hyperrectangle().is_bottom());
    }

    #[test]
    fn interval_token_parsing() {
        assert_eq!(parse_interval("[0.5;0.75]").unwrap(), Interval::new(0.5, 0.75));
        assert_eq!(parse_interval("[-1;1]").unwrap(), Interval::new(-1.0, 1.0));
        assert!(parse_interval("0.5;0.75").is_err());
        assert!(parse_interval("[a;b]").is_err());
    }
}
