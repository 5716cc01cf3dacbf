//! Snapshot construction.
//!
//! One forward walk over `reference -> member expression -> quantifier ->
//! ranged-over reference`, recording an explicit child -> parent edge for every
//! `(expression, quantifier)` pair it passes.
//!
//! The walk is depth-first over an explicit stack. A reference is registered
//! as a node the first time any quantifier (or the caller, for the root)
//! mentions it, and only newly registered references are pushed for expansion,
//! so every reference is expanded exactly once no matter how many paths reach
//! it. That makes shared sub-plans and cycles (including a reference that
//! consumes itself) terminate.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use memoref_plan::PlanGraph;
use petgraph::graph::{Graph, NodeIndex};
use tracing::{debug, debug_span, trace, warn};

use crate::config::TraversalConfig;
use crate::error::{TraversalError, TraversalResult};
use crate::traversal::{RefPath, RefTraversal, TraversalGraph};

pub(crate) fn build<P: PlanGraph>(
    plan: &P,
    root: P::Ref,
    config: &TraversalConfig,
) -> TraversalResult<RefTraversal<P>> {
    let _span = debug_span!("ref_traversal_build", root = ?root).entered();

    let generation = plan.generation();
    let mut graph: TraversalGraph<P> =
        Graph::with_capacity(config.node_capacity, config.edge_capacity);
    let mut index: AHashMap<P::Ref, NodeIndex> = AHashMap::with_capacity(config.node_capacity);

    match collect_network(plan, root, &mut graph, &mut index) {
        Ok(root_node) => {
            debug!(
                refs = graph.node_count(),
                paths = graph.edge_count(),
                "built ref traversal"
            );
            Ok(RefTraversal {
                root,
                root_node,
                graph,
                index,
                generation,
            })
        }
        Err(err) => {
            warn!(error = %err, "failed to build ref traversal");
            Err(err)
        }
    }
}

fn collect_network<P: PlanGraph>(
    plan: &P,
    root: P::Ref,
    graph: &mut TraversalGraph<P>,
    index: &mut AHashMap<P::Ref, NodeIndex>,
) -> TraversalResult<NodeIndex> {
    let root_node = graph.add_node(root);
    index.insert(root, root_node);

    let mut stack: Vec<(P::Ref, NodeIndex)> = vec![(root, root_node)];
    while let Some((current, current_node)) = stack.pop() {
        let members = plan
            .members(current)
            .ok_or_else(|| TraversalError::MalformedPlanGraph {
                detail: format!("reference {current:?} is not known to the plan"),
            })?;
        trace!(reference = ?current, members = members.len(), "expanding reference");

        for &expression in members {
            let quantifiers =
                plan.quantifiers(expression)
                    .ok_or_else(|| TraversalError::MalformedPlanGraph {
                        detail: format!(
                            "expression {expression:?} (member of {current:?}) is not known to the plan"
                        ),
                    })?;

            for &quantifier in quantifiers {
                let ranges_over = plan.ranges_over(quantifier).ok_or_else(|| {
                    TraversalError::MalformedPlanGraph {
                        detail: format!(
                            "quantifier {quantifier:?} of expression {expression:?} in {current:?} does not range over any reference"
                        ),
                    }
                })?;

                let child_node = match index.entry(ranges_over) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let node = graph.add_node(ranges_over);
                        entry.insert(node);
                        stack.push((ranges_over, node));
                        node
                    }
                };

                graph.add_edge(child_node, current_node, RefPath::new(expression, quantifier));
            }
        }
    }

    Ok(root_node)
}
