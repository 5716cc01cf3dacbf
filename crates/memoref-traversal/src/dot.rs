//! Graphviz export of a traversal snapshot.
//!
//! Edges point the way the snapshot stores them: from the consumed reference
//! to its consumer. The root gets a double border and leaves are shaded.

use std::fmt::Write as _;

use memoref_plan::PlanGraph;
use petgraph::visit::EdgeRef;

use crate::traversal::RefTraversal;

/// Render with `Debug` labels for references, expressions and quantifiers.
pub fn render_dot<P: PlanGraph>(traversal: &RefTraversal<P>) -> String {
    render_dot_with(traversal, |reference| format!("{reference:?}"))
}

/// Render with caller-supplied reference labels.
pub fn render_dot_with<P, F>(traversal: &RefTraversal<P>, mut label: F) -> String
where
    P: PlanGraph,
    F: FnMut(P::Ref) -> String,
{
    fn dot_escape(s: &str) -> String {
        s.replace('\\', "\\\\").replace('"', "\\\"")
    }

    let graph = &traversal.graph;
    let mut out = String::new();
    out.push_str("digraph memoref {\n");
    out.push_str("  rankdir=BT;\n");
    out.push_str("  node [shape=box, fontname=\"Helvetica\"];\n");
    out.push_str("  edge [fontname=\"Helvetica\", fontsize=10];\n\n");

    for node in graph.node_indices() {
        let view = crate::TraversableRef::new(traversal, node);
        let mut attrs = vec![format!("label=\"{}\"", dot_escape(&label(graph[node])))];
        if view.is_root() {
            attrs.push("peripheries=2".to_string());
        }
        if view.is_leaf() {
            attrs.push("style=filled".to_string());
            attrs.push("fillcolor=\"#eeeeee\"".to_string());
        }
        let _ = writeln!(out, "  n{} [{}];", node.index(), attrs.join(", "));
    }

    if graph.edge_count() > 0 {
        out.push('\n');
    }
    for edge in graph.edge_references() {
        let path = edge.weight();
        let edge_label = format!("{:?} / {:?}", path.expression(), path.quantifier());
        let _ = writeln!(
            out,
            "  n{} -> n{} [label=\"{}\"];",
            edge.source().index(),
            edge.target().index(),
            dot_escape(&edge_label)
        );
    }

    out.push_str("}\n");
    out
}
