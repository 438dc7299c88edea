// crates/arbor-verify/src/tree.rs

//! Single-tree verifier.
//!
//! A depth-first enumeration of the leaves reachable inside the region is a
//! complete decision procedure for one tree: every reachable leaf is a
//! candidate cell, and a leaf whose label set differs from the origin's
//! proves instability. When no such leaf exists the tree is stable — this
//! path never answers "unknown".

use arbor_core::{Hyperrectangle, LabelSet, StabilityStatus, Verdict};
use arbor_model::{DecisionTree, NodeId, NodeKind};
use arbor_search::{depth_first_search, DepthFirstSpace};
use tracing::debug;

/// Depth-first space over tree nodes reachable inside a region.
struct CounterexampleSearch<'a> {
    tree: &'a DecisionTree,
    region: &'a Hyperrectangle,
    labels_a: &'a LabelSet,
}

impl DepthFirstSpace for CounterexampleSearch<'_> {
    type Node = NodeId;

    fn is_goal(&mut self, node: &NodeId) -> bool {
        self.tree.kind(*node).is_leaf() && self.tree.leaf_labels(*node) != *self.labels_a
    }

    fn expand(&mut self, node: &NodeId, out: &mut Vec<NodeId>) {
        if let NodeKind::Split {
            feature,
            threshold,
            left,
            right,
        } = self.tree.kind(*node)
        {
            let iv = &self.region.intervals()[*feature as usize];
            if iv.lo <= *threshold {
                out.push(*left);
            }
            if iv.hi > *threshold {
                out.push(*right);
            }
        }
    }
}

/// Refine `region` with every split on the path from `leaf` to the root:
/// a left branch caps the upper bound at the threshold, a right branch
/// raises the lower bound to it.
fn leaf_region(tree: &DecisionTree, leaf: NodeId, region: &Hyperrectangle) -> Hyperrectangle {
    let mut refined = region.clone();
    let mut current = leaf;

    while let Some(parent) = tree.parent(current) {
        let NodeKind::Split {
            feature,
            threshold,
            left,
            ..
        } = tree.kind(parent)
        else {
            unreachable!("interior nodes are splits");
        };
        let iv = &mut refined.intervals_mut()[*feature as usize];
        if *left == current {
            iv.hi = iv.hi.min(*threshold);
        } else {
            iv.lo = iv.lo.max(*threshold);
        }
        current = parent;
    }
    refined
}

/// Decide stability of `tree` over `region`, writing the verdict (and the
/// witness, if unstable) into `status`.
pub(crate) fn verify_tree(
    tree: &DecisionTree,
    region: &Hyperrectangle,
    status: &mut StabilityStatus,
) {
    let mut search = CounterexampleSearch {
        tree,
        region,
        labels_a: &status.labels_a,
    };

    let offending = depth_first_search(&mut search, tree.root());
    match offending {
        Some(leaf) => {
            let refined = leaf_region(tree, leaf, region);
            debug!(region = %refined, "offending leaf found");
            status.set_counterexample(refined.midpoint(), refined);
        }
        // Every reachable leaf agrees with the origin; the enumeration is
        // complete, so this is a proof.
        None => status.result = Verdict::Stable,
    }
}
