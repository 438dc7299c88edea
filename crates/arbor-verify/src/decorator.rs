// crates/arbor-verify/src/decorator.rs

//! Decorators: nodes of the ensemble verifier's refinement derivation.
//!
//! A decorator couples a constraint region with the tree leaf whose path
//! produced it, a back-pointer to the decorator it refines, and the
//! overapproximated label set of its region. The whole derivation lives in
//! an arena indexed by [`DecoratorId`]; parent links are ids, never owning
//! references, and dropping the arena tears the tree down without recursion.

use arbor_core::{Hyperrectangle, LabelSet};
use arbor_model::NodeId;

/// Index of a decorator inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DecoratorId(u32);

impl DecoratorId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One refinement step: a region, the leaf that carved it, its parent.
#[derive(Debug)]
pub(crate) struct Decorator {
    /// Constraint region; released when the decorator is expanded.
    pub region: Option<Hyperrectangle>,
    /// Leaf of `trees[depth - 1]` this decorator was derived by reaching
    /// (`None` at the root).
    pub leaf: Option<NodeId>,
    /// Refined decorator (`None` at the root).
    pub parent: Option<DecoratorId>,
    /// Number of fixed trees on the path to the root.
    pub depth: u32,
    /// Sound overapproximation of the labels of points in the region.
    pub labels: LabelSet,
    /// Refinements derived from this decorator.
    pub children: Vec<DecoratorId>,
}

/// Arena owning a refinement derivation.
#[derive(Debug, Default)]
pub(crate) struct DecoratorArena {
    nodes: Vec<Decorator>,
}

impl DecoratorArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, decorator: Decorator) -> DecoratorId {
        let id = DecoratorId(u32::try_from(self.nodes.len()).expect("derivation too large"));
        self.nodes.push(decorator);
        id
    }

    /// Install the root decorator over the full adversarial region.
    pub fn root(&mut self, region: Hyperrectangle, n_labels: usize) -> DecoratorId {
        self.push(Decorator {
            region: Some(region),
            leaf: None,
            parent: None,
            depth: 0,
            labels: LabelSet::empty(n_labels),
            children: Vec::new(),
        })
    }

    /// Derive a child of `parent` through `leaf` constraining `region`.
    /// Labels start empty and are filled once overapproximated.
    pub fn child(
        &mut self,
        parent: DecoratorId,
        region: Hyperrectangle,
        leaf: NodeId,
        n_labels: usize,
    ) -> DecoratorId {
        let depth = self.nodes[parent.index()].depth + 1;
        let id = self.push(Decorator {
            region: Some(region),
            leaf: Some(leaf),
            parent: Some(parent),
            depth,
            labels: LabelSet::empty(n_labels),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    #[inline]
    pub fn get(&self, id: DecoratorId) -> &Decorator {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: DecoratorId) -> &mut Decorator {
        &mut self.nodes[id.index()]
    }

    /// Release a decorator's region, keeping leaf/children intact for
    /// parent-path reconstruction.
    pub fn take_region(&mut self, id: DecoratorId) -> Option<Hyperrectangle> {
        self.nodes[id.index()].region.take()
    }

    /// Leaves fixed on the path from `id` to the root, nearest first.
    pub fn fixed_leaves(&self, id: DecoratorId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = Some(id);
        std::iter::from_fn(move || {
            while let Some(at) = current {
                let node = self.get(at);
                current = node.parent;
                if let Some(leaf) = node.leaf {
                    return Some(leaf);
                }
            }
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::Interval;
    use arbor_model::TreeBuilder;

    fn some_box() -> Hyperrectangle {
        Hyperrectangle::new(vec![Interval::new(0.0, 1.0)])
    }

    #[test]
    fn depth_and_parent_chain() {
        // Borrow two leaf ids from a scratch tree.
        let mut b = TreeBuilder::new();
        let l0 = b.leaf_counts(vec![1, 0]);
        let l1 = b.leaf_counts(vec![0, 1]);
        let root_node = b.split(0, 0.5, l0, l1);
        let _ = b.build(root_node, 1, vec!["a".into(), "b".into()]).unwrap();

        let mut arena = DecoratorArena::new();
        let root = arena.root(some_box(), 2);
        let child = arena.child(root, some_box(), l0, 2);
        let grandchild = arena.child(child, some_box(), l1, 2);

        assert_eq!(arena.get(root).depth, 0);
        assert_eq!(arena.get(child).depth, 1);
        assert_eq!(arena.get(grandchild).depth, 2);
        assert_eq!(arena.get(root).children, vec![child]);

        let fixed: Vec<_> = arena.fixed_leaves(grandchild).collect();
        assert_eq!(fixed, vec![l1, l0]);
    }

    #[test]
    fn region_release_keeps_the_rest() {
        let mut arena = DecoratorArena::new();
        let root = arena.root(some_box(), 2);
        assert!(arena.take_region(root).is_some());
        assert!(arena.take_region(root).is_none());
        assert!(arena.get(root).leaf.is_none());
    }
}
