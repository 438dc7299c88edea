// crates/arbor-verify/src/scores.rs

//! Per-label score overapproximation for decorators.
//!
//! A decorator's score for a label is an interval combining two parts:
//! the *concrete* contribution of the leaves already fixed on its ancestor
//! path (one per fixed tree) and the *abstract* contribution of every
//! remaining tree, bounded over that tree's reachable leaves in the
//! decorator's region. Every accumulation goes through the outward-rounded
//! interval primitives, so the invariant that each score interval encloses
//! every achievable concrete score survives the floating point.
//!
//! The label set of a region is every label not strictly dominated by
//! another label's score interval — a sound superset of the true labels.

use crate::decorator::{DecoratorArena, DecoratorId};
use arbor_core::interval::{down, up};
use arbor_core::{Interval, LabelSet};
use arbor_model::{DecisionTree, Forest, NodeId, NodeKind, VotingScheme};

/// Reusable buffers sized once per sample.
#[derive(Debug, Default)]
pub(crate) struct ScoreScratch {
    /// Worklist for reachable-leaf enumeration.
    pub stack: Vec<NodeId>,
    /// Reachable leaves of the tree under inspection.
    pub leaves: Vec<NodeId>,
    /// Per-label argmax membership counts (max voting).
    pub argmax_hits: Vec<u32>,
}

/// Decision-score enclosure of `leaf` for `label`: an outward-rounded
/// empirical probability for count leaves, the exact log-score for
/// logarithmic leaves. Encloses the concrete per-tree decision function,
/// which is what the abstraction must cover.
fn leaf_score(tree: &DecisionTree, leaf: NodeId, label: usize) -> Interval {
    match tree.kind(leaf) {
        NodeKind::LeafCounts {
            counts, n_samples, ..
        } => {
            let p = f64::from(counts[label]) / f64::from(*n_samples);
            Interval::new(down(p), up(p))
        }
        NodeKind::LeafLogits { log_scores, .. } => Interval::point(log_scores[label]),
        NodeKind::Split { .. } => unreachable!("score of a split node"),
    }
}

/// `leaf_score` divided by the tree count (average voting).
fn leaf_score_averaged(tree: &DecisionTree, leaf: NodeId, label: usize, n_trees: f64) -> Interval {
    let p = leaf_score(tree, leaf, label);
    Interval::new(down(p.lo / n_trees), up(p.hi / n_trees))
}

/// Add the contribution of every fixed ancestor leaf.
fn concrete_scores(
    forest: &Forest,
    arena: &DecoratorArena,
    id: DecoratorId,
    scores: &mut [Interval],
) {
    let depth = arena.get(id).depth as usize;
    let n_trees = forest.n_trees() as f64;

    // fixed_leaves walks nearest-first: the leaf at offset o belongs to
    // trees[depth - 1 - o].
    for (offset, leaf) in arena.fixed_leaves(id).enumerate() {
        let tree = &forest.trees()[depth - 1 - offset];
        match forest.voting() {
            VotingScheme::Max => {
                for i in tree.leaf_labels(leaf).iter() {
                    scores[i] = scores[i].translate(1.0);
                }
            }
            VotingScheme::Average => {
                for (i, s) in scores.iter_mut().enumerate() {
                    *s = s.add(&leaf_score_averaged(tree, leaf, i, n_trees));
                }
            }
            VotingScheme::Softargmax => {
                for (i, s) in scores.iter_mut().enumerate() {
                    *s = s.add(&leaf_score(tree, leaf, i));
                }
            }
        }
    }
}

/// Add the abstract contribution of every remaining (unexpanded) tree,
/// bounded over its reachable leaves in the decorator's region.
fn sound_scores(
    forest: &Forest,
    arena: &DecoratorArena,
    id: DecoratorId,
    scores: &mut [Interval],
    scratch: &mut ScoreScratch,
) {
    let decorator = arena.get(id);
    let region = decorator
        .region
        .as_ref()
        .expect("unexpanded decorator owns its region");
    let depth = decorator.depth as usize;
    let n_trees = forest.n_trees() as f64;

    for tree in &forest.trees()[depth..] {
        tree.reachable_leaves(region, &mut scratch.stack, &mut scratch.leaves);
        let n_leaves = scratch.leaves.len() as u32;

        // A bottom sub-box reaches no leaves; an empty enumeration must
        // contribute nothing rather than vacuous certainty.
        if n_leaves == 0 {
            continue;
        }

        match forest.voting() {
            VotingScheme::Max => {
                // A label scores [1,1] from this tree iff it is argmax in
                // every reachable leaf, [0,0] iff in none, [0,1] otherwise.
                scratch.argmax_hits.clear();
                scratch.argmax_hits.resize(scores.len(), 0);
                for &leaf in &scratch.leaves {
                    for i in tree.leaf_labels(leaf).iter() {
                        scratch.argmax_hits[i] += 1;
                    }
                }
                for (s, &hits) in scores.iter_mut().zip(&scratch.argmax_hits) {
                    let vote = Interval::new(
                        f64::from(u8::from(hits == n_leaves)),
                        f64::from(u8::from(hits > 0)),
                    );
                    *s = s.add(&vote);
                }
            }
            VotingScheme::Average => {
                for (i, s) in scores.iter_mut().enumerate() {
                    let mut bound = Interval::new(1.0, 0.0);
                    for &leaf in &scratch.leaves {
                        let p = leaf_score_averaged(tree, leaf, i, n_trees);
                        bound.lo = bound.lo.min(p.lo);
                        bound.hi = bound.hi.max(p.hi);
                    }
                    *s = s.add(&bound);
                }
            }
            VotingScheme::Softargmax => {
                for (i, s) in scores.iter_mut().enumerate() {
                    let mut bound = Interval::new(f64::MAX, f64::MIN);
                    for &leaf in &scratch.leaves {
                        let v = leaf_score(tree, leaf, i);
                        bound.lo = bound.lo.min(v.lo);
                        bound.hi = bound.hi.max(v.hi);
                    }
                    *s = s.add(&bound);
                }
            }
        }
    }
}

/// Outward-rounded softargmax normalization of summed logit intervals.
///
/// Upper bound: largest numerator over smallest denominator; lower bound the
/// other way around. A non-finite upper endpoint (unbounded logits, or a
/// denominator that underflowed to zero) saturates at 1.0, since a
/// normalized score never exceeds 1; a non-finite lower endpoint collapses
/// to 0.0.
fn normalize_softargmax(scores: &mut [Interval]) {
    let exps: Vec<Interval> = scores.iter().map(Interval::exp).collect();
    let mut denom_min = 0.0_f64;
    let mut denom_max = 0.0_f64;
    for e in &exps {
        denom_min = down(denom_min + e.lo);
        denom_max = up(denom_max + e.hi);
    }

    for (s, e) in scores.iter_mut().zip(&exps) {
        let lo = down(e.lo / denom_max);
        let hi = up(e.hi / denom_min);
        // True normalized scores live in [0, 1]; clamping keeps the outward
        // rounding from leaking outside that range.
        s.lo = if lo.is_finite() { lo.max(0.0) } else { 0.0 };
        s.hi = if hi.is_finite() { hi } else { 1.0 };
    }
}

/// Labels not strictly dominated by another label's score interval.
fn scores_to_labels(scores: &[Interval]) -> LabelSet {
    let mut labels = LabelSet::empty(scores.len());
    for i in 0..scores.len() {
        let dominated = (0..scores.len()).any(|j| j != i && scores[i].is_lt(&scores[j]));
        if !dominated {
            labels.insert(i);
        }
    }
    labels
}

/// Sound label overapproximation of the decorator's region: concrete fixed
/// contributions plus abstract bounds for the remaining trees, then the
/// non-dominated labels.
pub(crate) fn overapproximate_labels(
    forest: &Forest,
    arena: &DecoratorArena,
    id: DecoratorId,
    scratch: &mut ScoreScratch,
) -> LabelSet {
    let mut scores = vec![Interval::ZERO; forest.n_labels()];
    concrete_scores(forest, arena, id, &mut scores);
    sound_scores(forest, arena, id, &mut scores, scratch);
    if forest.voting() == VotingScheme::Softargmax {
        normalize_softargmax(&mut scores);
    }
    scores_to_labels(&scores)
}
