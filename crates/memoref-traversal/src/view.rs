//! Navigable views over snapshot references.
//!
//! A plan only answers "what does this expression consume". `TraversableRef`
//! answers the reverse questions (who consumes me, what lies above me) against
//! the snapshot it was obtained from.

use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};

use ahash::AHashSet;
use memoref_plan::PlanGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::traversal::{RefPath, RefTraversal};

/// A reference of a [`RefTraversal`], with parent/child/ancestor navigation.
pub struct TraversableRef<'t, P: PlanGraph> {
    traversal: &'t RefTraversal<P>,
    node: NodeIndex,
}

impl<'t, P: PlanGraph> TraversableRef<'t, P> {
    pub(crate) fn new(traversal: &'t RefTraversal<P>, node: NodeIndex) -> Self {
        Self { traversal, node }
    }

    /// The wrapped plan reference.
    pub fn reference(&self) -> P::Ref {
        self.traversal.graph[self.node]
    }

    pub fn traversal(&self) -> &'t RefTraversal<P> {
        self.traversal
    }

    /// Distinct references with a member expression that consumes this one.
    ///
    /// Several quantifiers over this reference from the same parent yield
    /// that parent once. A reference that consumes itself is its own parent.
    pub fn parent_refs(&self) -> Vec<TraversableRef<'t, P>> {
        self.neighbors(Direction::Outgoing)
    }

    /// Distinct references consumed by this reference's member expressions.
    pub fn child_refs(&self) -> Vec<TraversableRef<'t, P>> {
        self.neighbors(Direction::Incoming)
    }

    /// One entry per path record leading to a parent (not deduplicated).
    pub fn parent_paths(&self) -> Vec<(TraversableRef<'t, P>, RefPath<P::Expr, P::Quantifier>)> {
        self.traversal
            .graph
            .edges_directed(self.node, Direction::Outgoing)
            .map(|edge| {
                (
                    TraversableRef::new(self.traversal, edge.target()),
                    *edge.weight(),
                )
            })
            .collect()
    }

    /// Every reference reachable through repeated parent links, each once, in
    /// breadth-first order.
    ///
    /// This reference is included only when it lies on a cycle.
    pub fn ancestors(&self) -> Vec<TraversableRef<'t, P>> {
        let graph = &self.traversal.graph;
        let mut seen: AHashSet<NodeIndex> = AHashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        let mut out = Vec::new();

        queue.push_back(self.node);
        while let Some(node) = queue.pop_front() {
            for parent in graph.neighbors_directed(node, Direction::Outgoing) {
                if seen.insert(parent) {
                    out.push(TraversableRef::new(self.traversal, parent));
                    queue.push_back(parent);
                }
            }
        }
        out
    }

    /// Whether this reference consumes `other`, directly or transitively.
    ///
    /// A reference of a different snapshot counts only if its handle is also
    /// a node of this one.
    pub fn is_ancestor_of(&self, other: &TraversableRef<'_, P>) -> bool {
        let Some(start) = self.traversal.node_of(other.reference()) else {
            return false;
        };
        let graph = &self.traversal.graph;
        let mut seen: AHashSet<NodeIndex> = AHashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for parent in graph.neighbors_directed(node, Direction::Outgoing) {
                if parent == self.node {
                    return true;
                }
                if seen.insert(parent) {
                    stack.push(parent);
                }
            }
        }
        false
    }

    /// True when no member expression of this reference consumes anything.
    pub fn is_leaf(&self) -> bool {
        self.traversal
            .graph
            .edges_directed(self.node, Direction::Incoming)
            .next()
            .is_none()
    }

    pub fn is_root(&self) -> bool {
        self.node == self.traversal.root_node
    }

    fn neighbors(&self, direction: Direction) -> Vec<TraversableRef<'t, P>> {
        let mut seen: AHashSet<NodeIndex> = AHashSet::new();
        self.traversal
            .graph
            .edges_directed(self.node, direction)
            .map(|edge| match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            })
            .filter(|&node| seen.insert(node))
            .map(|node| TraversableRef::new(self.traversal, node))
            .collect()
    }
}

impl<P: PlanGraph> Clone for TraversableRef<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: PlanGraph> Copy for TraversableRef<'_, P> {}

impl<P: PlanGraph> PartialEq for TraversableRef<'_, P> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.traversal, other.traversal) && self.node == other.node
    }
}

impl<P: PlanGraph> Eq for TraversableRef<'_, P> {}

impl<P: PlanGraph> Hash for TraversableRef<'_, P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference().hash(state);
    }
}

impl<P: PlanGraph> fmt::Debug for TraversableRef<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TraversableRef")
            .field(&self.reference())
            .finish()
    }
}
