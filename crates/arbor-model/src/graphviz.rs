// crates/arbor-model/src/graphviz.rs

//! Graphviz export of decision trees.
//!
//! Leaves render as boxes with their per-label payload, splits as diamonds
//! labeled with the tested predicate; the true branch goes left. Node names
//! are arena indices, so the output is stable across runs.

use crate::tree::{DecisionTree, NodeKind};
use anyhow::Result;
use std::io::Write;

fn fmt_counts(counts: &[u32]) -> String {
    counts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn fmt_logits(scores: &[f64]) -> String {
    scores
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write `tree` as a `dot` digraph.
///
/// # Errors
/// Propagates writer failures.
pub fn write_tree_dot<W: Write>(w: &mut W, tree: &DecisionTree) -> Result<()> {
    writeln!(w, "digraph D {{")?;

    // Preorder over an explicit stack, matching the tree's own traversals.
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        match tree.kind(id) {
            NodeKind::LeafCounts { counts, .. } => {
                writeln!(w, "{} [shape=box label=\"[{}]\"]", id.index(), fmt_counts(counts))?;
            }
            NodeKind::LeafLogits { log_scores, .. } => {
                writeln!(
                    w,
                    "{} [shape=box label=\"[{}]\"]",
                    id.index(),
                    fmt_logits(log_scores)
                )?;
            }
            NodeKind::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                writeln!(
                    w,
                    "{} [shape=diamond label=<x<sub>{feature}</sub> &le; {threshold}>]",
                    id.index()
                )?;
                writeln!(w, "{} -> {} [label=\"T\"]", id.index(), left.index())?;
                writeln!(w, "{} -> {} [label=\"F\"]", id.index(), right.index())?;
                stack.push(*right);
                stack.push(*left);
            }
        }
    }

    writeln!(w, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    #[test]
    fn stump_renders_both_branches() {
        let mut b = TreeBuilder::new();
        let left = b.leaf_counts(vec![10, 0]);
        let right = b.leaf_counts(vec![0, 10]);
        let root = b.split(0, 0.5, left, right);
        let tree = b.build(root, 1, vec!["a".into(), "b".into()]).unwrap();

        let mut out = Vec::new();
        write_tree_dot(&mut out, &tree).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.starts_with("digraph D {"));
        assert!(dot.contains("shape=diamond"));
        assert!(dot.contains("[shape=box label=\"[10, 0]\"]"));
        assert!(dot.contains("-> 0 [label=\"T\"]"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
