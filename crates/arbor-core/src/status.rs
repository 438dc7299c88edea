// crates/arbor-core/src/status.rs

//! Verdicts and per-sample analysis status.

use crate::hyperrectangle::Hyperrectangle;
use crate::labels::LabelSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of a stability analysis. A sample's verdict is never "error":
/// unrecoverable conditions abort the run before a verdict exists.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    /// Every point of the region receives the sample's label set.
    Stable,
    /// A concrete witness with a different classification was found.
    Unstable,
    /// The per-sample budget ran out before a conclusion.
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stable => "stable",
            Self::Unstable => "unstable",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Mutable per-sample analysis state.
///
/// `sample_a`/`labels_a` describe the origin point; `sample_b` and `region`
/// are filled iff the verdict is [`Verdict::Unstable`], in which case
/// `sample_b ∈ region` and the classifier labels `sample_b` differently from
/// `sample_a`.
#[derive(Clone, Debug)]
pub struct StabilityStatus {
    /// Analysis result.
    pub result: Verdict,
    /// Origin point.
    pub sample_a: Vec<f64>,
    /// Classification of the origin point.
    pub labels_a: LabelSet,
    /// Counterexample point, present iff unstable.
    pub sample_b: Option<Vec<f64>>,
    /// Counterexample region, present iff unstable.
    pub region: Option<Hyperrectangle>,
    /// Per-sample wall-clock budget.
    pub timeout: Duration,
}

impl StabilityStatus {
    /// Fresh status for one sample, initially [`Verdict::Unknown`].
    #[must_use]
    pub fn new(sample_a: Vec<f64>, labels_a: LabelSet, timeout: Duration) -> Self {
        Self {
            result: Verdict::Unknown,
            sample_a,
            labels_a,
            sample_b: None,
            region: None,
            timeout,
        }
    }

    /// Record a counterexample and flip the verdict to unstable.
    pub fn set_counterexample(&mut self, witness: Vec<f64>, region: Hyperrectangle) {
        self.result = Verdict::Unstable;
        self.sample_b = Some(witness);
        self.region = Some(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;

    #[test]
    fn counterexample_flips_verdict() {
        let mut status = StabilityStatus::new(vec![0.0], LabelSet::empty(2), Duration::from_secs(1));
        assert_eq!(status.result, Verdict::Unknown);
        status.set_counterexample(
            vec![0.55],
            Hyperrectangle::new(vec![Interval::new(0.5, 0.6)]),
        );
        assert_eq!(status.result, Verdict::Unstable);
        assert!(status.sample_b.is_some());
        assert!(status.region.is_some());
    }
}
