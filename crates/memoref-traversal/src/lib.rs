//! Memoref Traversal: Reverse Navigation over Expression References
//!
//! A plan only points downward: a reference owns expressions, an expression owns
//! quantifiers, and a quantifier ranges over another reference. Rewrite rules
//! frequently need the opposite direction ("which references consume this
//! one?"), which the plan cannot answer without a reverse index.
//!
//! `RefTraversal` is that index: one forward walk from a root reference yields
//! an immutable directed multigraph
//!
//! ```text
//!   child ref ──(expression, quantifier)──► parent ref
//! ```
//!
//! with one edge per quantifier, parallel edges and self-loops included.
//! `TraversableRef` then answers parent, child, ancestor and leaf queries.
//!
//! ```
//! use memoref_plan::{PlanArena, QuantifierKind};
//! use memoref_traversal::RefTraversal;
//!
//! let mut plan = PlanArena::new();
//! let top = plan.add_ref();
//! let scan = plan.add_ref();
//! let filter = plan.add_expr(top, "Filter")?;
//! plan.add_quantifier(filter, "s", QuantifierKind::ForEach, scan)?;
//! plan.add_expr(scan, "Scan")?;
//!
//! let traversal = RefTraversal::with_root(&plan, top)?;
//! let parents = traversal.from(scan)?.parent_refs();
//! assert_eq!(parents.len(), 1);
//! assert_eq!(parents[0].reference(), top);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Snapshots are point-in-time: after mutating the plan, rebuild (or call
//! `ensure_fresh` to detect the mismatch).

mod builder;
pub mod config;
pub mod dot;
mod error;
mod traversal;
mod view;

pub use config::TraversalConfig;
pub use dot::{render_dot, render_dot_with};
pub use error::{TraversalError, TraversalResult};
pub use traversal::{RefEdge, RefPath, RefTraversal};
pub use view::TraversableRef;
