// crates/arbor-core/src/tier.rs

//! Categorical feature groups ("tiers").
//!
//! A tier groups the columns of a one-hot encoded categorical attribute:
//! inside a group exactly one feature is 1 and the rest are 0. The verifier
//! re-establishes this invariant every time a grouped feature is refined, so
//! the search never wastes effort on regions with no valid encoding.

use crate::hyperrectangle::Hyperrectangle;
use crate::interval::Interval;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Group assignment per feature; `0` means ungrouped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tier {
    groups: Vec<u32>,
}

impl Tier {
    /// A tier with no grouped features.
    #[must_use]
    pub fn ungrouped(n_features: usize) -> Self {
        Self {
            groups: vec![0; n_features],
        }
    }

    /// Tier from an explicit group vector (`0` = ungrouped).
    #[must_use]
    pub fn new(groups: Vec<u32>) -> Self {
        Self { groups }
    }

    /// Load a tier from a file of whitespace-separated group ids.
    ///
    /// # Errors
    /// Fails on unreadable files, malformed tokens, or a length different
    /// from `n_features`.
    pub fn from_file<P: AsRef<Path>>(path: P, n_features: usize) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read tier file {}", path.display()))?;

        let mut groups = Vec::new();
        for (idx, token) in text.split_whitespace().enumerate() {
            let g: u32 = token
                .parse()
                .with_context(|| format!("tier entry #{idx} in {}", path.display()))?;
            groups.push(g);
        }
        if groups.len() != n_features {
            bail!(
                "tier file {} has {} entries, expected {}",
                path.display(),
                groups.len(),
                n_features
            );
        }
        Ok(Self { groups })
    }

    /// Number of features covered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the tier covers no features at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether no feature belongs to a group.
    #[must_use]
    pub fn is_ungrouped(&self) -> bool {
        self.groups.iter().all(|&g| g == 0)
    }

    /// Group of feature `i`, or `None` when ungrouped.
    #[inline]
    #[must_use]
    pub fn group_of(&self, i: usize) -> Option<u32> {
        match self.groups.get(i) {
            Some(&g) if g > 0 => Some(g),
            _ => None,
        }
    }

    /// Re-establish the one-hot invariant of feature `i`'s group inside
    /// `region` after `i` was set on (`active`) or off.
    ///
    /// - `active`: pin `i` to `[1,1]` and every sibling to `[0,0]`.
    /// - not `active`: pin `i` to `[0,0]`; if every sibling but one is
    ///   already `[0,0]`, pin the remaining one to `[1,1]`.
    ///
    /// Ungrouped features are untouched.
    pub fn adjust(&self, region: &mut Hyperrectangle, i: usize, active: bool) {
        let Some(group) = self.group_of(i) else {
            return;
        };
        let intervals = region.intervals_mut();

        if active {
            intervals[i] = Interval::ONE;
            for (j, &g) in self.groups.iter().enumerate() {
                if j != i && g == group {
                    intervals[j] = Interval::ZERO;
                }
            }
            return;
        }

        intervals[i] = Interval::ZERO;
        let mut candidate = None;
        let mut n_live = 0usize;
        for (j, &g) in self.groups.iter().enumerate() {
            if g != group {
                continue;
            }
            let off = intervals[j].lo == 0.0 && intervals[j].hi == 0.0;
            if !off {
                candidate = Some(j);
                n_live += 1;
            }
        }
        if n_live == 1 {
            if let Some(j) = candidate {
                intervals[j] = Interval::ONE;
            }
        }
    }
}
