//! The traversal snapshot.

use std::fmt;

use ahash::AHashMap;
use memoref_plan::{PlanGeneration, PlanGraph};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::builder;
use crate::config::TraversalConfig;
use crate::error::{TraversalError, TraversalResult};
use crate::view::TraversableRef;

pub(crate) type TraversalGraph<P> = Graph<
    <P as PlanGraph>::Ref,
    RefPath<<P as PlanGraph>::Expr, <P as PlanGraph>::Quantifier>,
>;

/// Why a child reference is linked to a parent: `expression` (a member of the
/// parent) consumes the child through `quantifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefPath<E, Q> {
    expression: E,
    quantifier: Q,
}

impl<E: Copy, Q: Copy> RefPath<E, Q> {
    pub fn new(expression: E, quantifier: Q) -> Self {
        Self {
            expression,
            quantifier,
        }
    }

    pub fn expression(&self) -> E {
        self.expression
    }

    pub fn quantifier(&self) -> Q {
        self.quantifier
    }
}

/// A path record together with the references it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefEdge<R, E, Q> {
    pub child: R,
    pub parent: R,
    pub path: RefPath<E, Q>,
}

/// Point-in-time directed multigraph over the references reachable from a root.
///
/// Nodes are references (by handle identity); each edge runs from a consumed
/// reference to the reference whose member expression consumes it, labeled with
/// the `(expression, quantifier)` pair responsible. Parallel edges and
/// self-loops are kept.
///
/// The snapshot never changes after [`RefTraversal::with_root`] returns, so it
/// can be shared across threads for reading. It does not follow later plan
/// mutations: rebuild it after the plan changes (see
/// [`RefTraversal::ensure_fresh`]).
pub struct RefTraversal<P: PlanGraph> {
    pub(crate) root: P::Ref,
    pub(crate) root_node: NodeIndex,
    pub(crate) graph: TraversalGraph<P>,
    pub(crate) index: AHashMap<P::Ref, NodeIndex>,
    pub(crate) generation: Option<PlanGeneration>,
}

impl<P: PlanGraph> RefTraversal<P> {
    /// Build a snapshot of everything reachable from `root`.
    pub fn with_root(plan: &P, root: P::Ref) -> TraversalResult<Self> {
        builder::build(plan, root, &TraversalConfig::default())
    }

    pub fn with_root_config(
        plan: &P,
        root: P::Ref,
        config: &TraversalConfig,
    ) -> TraversalResult<Self> {
        builder::build(plan, root, config)
    }

    /// View over the snapshot's root.
    pub fn root(&self) -> TraversableRef<'_, P> {
        TraversableRef::new(self, self.root_node)
    }

    pub fn root_ref(&self) -> P::Ref {
        self.root
    }

    /// View over an arbitrary reference of this snapshot.
    pub fn from(&self, reference: P::Ref) -> TraversalResult<TraversableRef<'_, P>> {
        self.index
            .get(&reference)
            .map(|&node| TraversableRef::new(self, node))
            .ok_or_else(|| TraversalError::UnknownReference {
                reference: format!("{reference:?}"),
                root: format!("{:?}", self.root),
            })
    }

    pub fn contains(&self, reference: P::Ref) -> bool {
        self.index.contains_key(&reference)
    }

    /// References whose member expressions consume nothing.
    pub fn leaves(&self) -> Vec<TraversableRef<'_, P>> {
        self.graph
            .node_indices()
            .filter(|&node| {
                self.graph
                    .edges_directed(node, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|node| TraversableRef::new(self, node))
            .collect()
    }

    /// Every reference of the snapshot, in discovery order.
    pub fn refs(&self) -> impl Iterator<Item = P::Ref> + '_ {
        self.graph.node_weights().copied()
    }

    /// Every path record of the snapshot, in insertion order.
    pub fn ref_paths(
        &self,
    ) -> impl Iterator<Item = RefEdge<P::Ref, P::Expr, P::Quantifier>> + '_ {
        self.graph.edge_references().map(|edge| RefEdge {
            child: self.graph[edge.source()],
            parent: self.graph[edge.target()],
            path: *edge.weight(),
        })
    }

    pub fn ref_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn path_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Plan generation observed when the snapshot was built.
    pub fn generation(&self) -> Option<PlanGeneration> {
        self.generation
    }

    /// Check that `plan` is still in the state this snapshot was built from.
    ///
    /// Plans that do not track generations are always considered fresh.
    pub fn ensure_fresh(&self, plan: &P) -> TraversalResult<()> {
        let current = plan.generation();
        match (self.generation, current) {
            (None, None) => Ok(()),
            (Some(built), Some(current)) if built == current => Ok(()),
            (built, current) => Err(TraversalError::StaleSnapshot {
                built: describe_generation(built),
                current: describe_generation(current),
            }),
        }
    }

    pub(crate) fn node_of(&self, reference: P::Ref) -> Option<NodeIndex> {
        self.index.get(&reference).copied()
    }
}

fn describe_generation(generation: Option<PlanGeneration>) -> String {
    generation.map_or_else(|| "untracked".to_string(), |g| g.to_string())
}

impl<P: PlanGraph> fmt::Debug for RefTraversal<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefTraversal")
            .field("root", &self.root)
            .field("refs", &self.graph.node_count())
            .field("paths", &self.graph.edge_count())
            .field("generation", &self.generation)
            .finish()
    }
}
