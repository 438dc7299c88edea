// crates/arbor-verify/src/ensemble.rs

//! Ensemble verifier: best-first refinement over decorators.
//!
//! The derivation starts from one decorator holding the full adversarial
//! region. Expanding a decorator at depth `d` partitions its region along
//! the reachable leaves of `trees[d]`, creating one child per leaf with a
//! sound label overapproximation. Children whose labels are disjoint from
//! the origin's prove instability on the spot; children that agree exactly
//! are robust cells and are dropped; the rest join the frontier. A
//! fully-determined decorator (`d == n_trees`) is checked concretely.
//!
//! The frontier is best-first: smaller regions, deeper decorators, and more
//! non-consistent labels are expanded earlier. The wall clock is polled once
//! per expansion; running out of budget aborts the sample with an unknown
//! verdict instead of an answer.

use crate::decorator::{DecoratorArena, DecoratorId};
use crate::scores::{overapproximate_labels, ScoreScratch};
use arbor_core::{Hyperrectangle, LabelSet, StabilityStatus, Tier, Verdict};
use arbor_model::{Forest, NodeId, NodeKind};
use arbor_search::{best_first_search, BestFirstSpace, PriorityQueue};
use std::time::{Duration, Instant};
use tracing::debug;

/// Separation between the two half-spaces of a split: small enough to keep
/// floating-point strict inequalities consistent with the `≤` convention.
const SPLIT_EPSILON: f64 = 1e-12;

/// Volume weight of the frontier priority.
const VOLUME_WEIGHT: f64 = 1e6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InternalStatus {
    /// No information discovered yet.
    DontKnow,
    /// A counterexample cell was found.
    Unstable,
    /// The time budget ran out.
    Aborted,
}

struct AnalysisContext<'a> {
    forest: &'a Forest,
    tier: &'a Tier,
    labels_a: &'a LabelSet,
    start: Instant,
    budget: Duration,
    status: InternalStatus,
    counterexample: Option<(Vec<f64>, Hyperrectangle)>,
    arena: DecoratorArena,
    scratch: ScoreScratch,
    expansions: u64,
}

impl AnalysisContext<'_> {
    /// Record a counterexample cell and stop the search.
    fn flag_unstable(&mut self, region: &Hyperrectangle) {
        self.status = InternalStatus::Unstable;
        self.counterexample = Some((region.midpoint(), region.clone()));
    }

    /// Partition `id` along the reachable leaves of the next tree.
    fn refine(&mut self, id: DecoratorId, out: &mut Vec<DecoratorId>) {
        self.expansions += 1;
        let depth = self.arena.get(id).depth as usize;
        let n_labels = self.forest.n_labels();

        // Fully determined: every tree fixed, the label set is exact.
        if depth == self.forest.n_trees() {
            let region = self
                .arena
                .take_region(id)
                .expect("frontier decorator owns its region");
            if self.arena.get(id).labels != *self.labels_a {
                self.flag_unstable(&region);
            }
            return;
        }

        let tree = &self.forest.trees()[depth];
        let region = self
            .arena
            .take_region(id)
            .expect("frontier decorator owns its region");

        // Joint walk of (sub-box, tree node), widest-and-deepest first.
        let mut queue: PriorityQueue<(Hyperrectangle, NodeId)> = PriorityQueue::new();
        queue.push((region, tree.root()), 0.0);

        while let Some((mut sub, node)) = queue.pop() {
            match tree.kind(node) {
                NodeKind::LeafCounts { .. } | NodeKind::LeafLogits { .. } => {
                    let child = self.arena.child(id, sub, node, n_labels);
                    let labels =
                        overapproximate_labels(self.forest, &self.arena, child, &mut self.scratch);

                    if labels.is_disjoint(self.labels_a) {
                        // Every point of the cell disagrees with the origin.
                        self.arena.get_mut(child).labels = labels;
                        let region = self
                            .arena
                            .get(child)
                            .region
                            .as_ref()
                            .expect("fresh child owns its region")
                            .clone();
                        self.flag_unstable(&region);
                        break;
                    }
                    if labels == *self.labels_a {
                        // Robust cell: keep it in the derivation, skip the
                        // frontier.
                        self.arena.get_mut(child).labels = labels;
                        continue;
                    }
                    self.arena.get_mut(child).labels = labels;
                    out.push(child);
                }
                NodeKind::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let i = *feature as usize;
                    let k = *threshold;
                    let (left, right) = (*left, *right);
                    let iv = sub.intervals()[i];
                    let node_depth = f64::from(tree.node_depth(node));
                    // Branch priority biases toward wider, deeper splits:
                    // node depth plus the fraction of the interval's width
                    // that lies on that side.
                    let width = iv.hi - iv.lo;

                    if iv.lo <= k && iv.hi > k {
                        // The cutting hyperplane crosses the box: branch.
                        let mut right_box = sub.clone();

                        sub.intervals_mut()[i].hi = iv.hi.min(k);
                        self.tier.adjust(&mut sub, i, false);
                        let priority = node_depth + (k - iv.lo) / width;
                        queue.push((sub, left), priority);

                        right_box.intervals_mut()[i].lo = iv.lo.max(k + SPLIT_EPSILON);
                        self.tier.adjust(&mut right_box, i, true);
                        let priority = node_depth + (iv.hi - k) / width;
                        queue.push((right_box, right), priority);
                    } else if iv.hi <= k {
                        self.tier.adjust(&mut sub, i, false);
                        let priority = node_depth + (k - iv.lo) / width;
                        queue.push((sub, left), priority);
                    } else {
                        self.tier.adjust(&mut sub, i, true);
                        let priority = node_depth + (iv.hi - k) / width;
                        queue.push((sub, right), priority);
                    }
                }
            }
        }
        // Unvisited sub-boxes (on early exit) drop with the queue.
    }
}

impl BestFirstSpace for AnalysisContext<'_> {
    type Node = DecoratorId;

    /// Goal test doubles as the cooperative cancellation point: it runs once
    /// per expansion, before any work on the popped decorator.
    fn is_goal(&mut self, _node: &DecoratorId) -> bool {
        if self.status != InternalStatus::DontKnow {
            return true;
        }
        if self.start.elapsed() > self.budget {
            self.status = InternalStatus::Aborted;
            return true;
        }
        false
    }

    fn expand(&mut self, node: DecoratorId, out: &mut Vec<DecoratorId>) {
        self.refine(node, out);
    }

    /// Prefer small regions (tight bounds), deep decorators (close to a full
    /// assignment), and label sets with more disagreement.
    fn priority(&self, node: &DecoratorId) -> f64 {
        let decorator = self.arena.get(*node);
        let volume = decorator
            .region
            .as_ref()
            .expect("frontier decorator owns its region")
            .volume();
        let n_extra = decorator.labels.cardinality()
            - decorator.labels.intersection_cardinality(self.labels_a);

        -VOLUME_WEIGHT * volume
            + f64::from(decorator.depth)
            + n_extra as f64 / self.forest.n_labels() as f64
    }
}

/// Decide stability of `forest` over `region`, writing the verdict (and the
/// witness, if unstable) into `status`.
pub(crate) fn verify_forest(
    forest: &Forest,
    tier: &Tier,
    region: &Hyperrectangle,
    status: &mut StabilityStatus,
) {
    let labels_a = status.labels_a.clone();
    let mut ctx = AnalysisContext {
        forest,
        tier,
        labels_a: &labels_a,
        start: Instant::now(),
        budget: status.timeout,
        status: InternalStatus::DontKnow,
        counterexample: None,
        arena: DecoratorArena::new(),
        scratch: ScoreScratch::default(),
        expansions: 0,
    };
    let root = ctx.arena.root(region.clone(), forest.n_labels());

    best_first_search(&mut ctx, root);
    debug!(
        expansions = ctx.expansions,
        outcome = ?ctx.status,
        "ensemble refinement finished"
    );

    match ctx.status {
        // Frontier exhausted without a counterexample: every cell was
        // robust, so the overapproximation proves stability.
        InternalStatus::DontKnow => status.result = Verdict::Stable,
        InternalStatus::Unstable => {
            let (witness, region) = ctx
                .counterexample
                .take()
                .expect("unstable outcome carries its witness");
            status.set_counterexample(witness, region);
        }
        InternalStatus::Aborted => status.result = Verdict::Unknown,
    }
}
