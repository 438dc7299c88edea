// crates/arbor-verify/src/stability.rs

//! Stability orchestrator.
//!
//! One analysis is configured per classifier (abstract domain, tier,
//! per-sample budget) and then driven over samples. Each sample is
//! classified concretely, its adversarial region lowered to a box, and the
//! verdict produced by the verifier matching the model kind. Timeouts are
//! per sample and non-fatal; only I/O-level problems are errors.

use crate::{ensemble, tree};
use anyhow::{bail, Result};
use arbor_core::{AdversarialRegion, Perturbation, StabilityStatus, Tier, Verdict};
use arbor_model::Classifier;
use std::time::Duration;
use tracing::debug;

/// Abstract domain selector. Only the hyperrectangle domain is supported
/// end-to-end; the interval domain is reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbstractDomain {
    /// Reserved; rejected when constructing an analysis.
    Interval,
    /// Axis-aligned boxes, the working domain.
    Hyperrectangle,
}

/// Per-classifier analysis configuration.
pub struct StabilityAnalysis<'a> {
    classifier: &'a Classifier,
    tier: Tier,
    timeout: Duration,
}

impl<'a> StabilityAnalysis<'a> {
    /// Configure an analysis.
    ///
    /// # Errors
    /// Fails for the reserved interval domain and for a tier vector whose
    /// length differs from the classifier's feature space.
    pub fn new(
        classifier: &'a Classifier,
        domain: AbstractDomain,
        tier: Option<Tier>,
        timeout: Duration,
    ) -> Result<Self> {
        if domain == AbstractDomain::Interval {
            bail!("the interval abstract domain is reserved; use hyperrectangle");
        }
        let n_features = classifier.n_features() as usize;
        let tier = tier.unwrap_or_else(|| Tier::ungrouped(n_features));
        if tier.len() != n_features {
            bail!(
                "tier covers {} features but the classifier has {n_features}",
                tier.len()
            );
        }
        Ok(Self {
            classifier,
            tier,
            timeout,
        })
    }

    /// Decide stability of one sample under `perturbation`.
    ///
    /// The verdict is always stable, unstable (with witness), or unknown;
    /// an `Err` only signals malformed inputs such as a dimension mismatch.
    ///
    /// # Errors
    /// Fails when the sample or an explicit region disagrees with the
    /// classifier's feature space.
    pub fn analyze(&self, sample: &[f64], perturbation: &Perturbation) -> Result<StabilityStatus> {
        let n_features = self.classifier.n_features() as usize;
        if sample.len() != n_features {
            bail!(
                "sample has {} features but the classifier expects {n_features}",
                sample.len()
            );
        }

        let labels_a = self.classifier.classify(sample);
        let mut status = StabilityStatus::new(sample.to_vec(), labels_a, self.timeout);

        let region = AdversarialRegion {
            sample,
            perturbation,
        }
        .to_hyperrectangle();
        if region.dim() != n_features {
            bail!(
                "adversarial region has {} dimensions but the classifier expects {n_features}",
                region.dim()
            );
        }

        // A region emptied by clipping has no points, hence no witnesses.
        if region.is_bottom() {
            status.result = Verdict::Stable;
            return Ok(status);
        }

        match self.classifier {
            Classifier::Tree(t) => tree::verify_tree(t, &region, &mut status),
            Classifier::Forest(f) => ensemble::verify_forest(f, &self.tier, &region, &mut status),
        }
        debug!(verdict = %status.result, "sample analyzed");
        Ok(status)
    }
}
