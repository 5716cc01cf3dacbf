//! Memoref plan model
//!
//! The optimizer's search space is made of three kinds of objects:
//!
//! - **references**: slots holding one or more interchangeable expression variants,
//! - **expressions**: plan operators owned by exactly one reference,
//! - **quantifiers**: bindings owned by an expression that range over a reference.
//!
//! Ownership only points "downward" (reference → expression → quantifier →
//! ranged-over reference). Reverse navigation is built elsewhere
//! (`memoref-traversal`) against the [`PlanGraph`] trait defined here.
//!
//! ## Module Organization
//!
//! - `arena`: handle-based in-memory plan model implementing [`PlanGraph`]
//! - `description`: JSON plan descriptions lowered into an arena
//! - `token`: process-local plan identity + mutation generations

pub mod arena;
pub mod description;
mod error;
pub mod token;

use std::fmt;
use std::hash::Hash;

pub use arena::{ExprId, PlanArena, QuantifierId, QuantifierKind, RefId};
pub use description::{
    BuiltPlan, ExprDescription, PlanDescription, QuantifierDescription, RefDescription,
};
pub use error::{PlanError, PlanResult};
pub use token::{PlanGeneration, PlanToken};

// ============================================================================
// Plan seam
// ============================================================================

/// Read-only access to a plan's containment structure.
///
/// Handles are opaque identities: two handles compare equal iff they name the
/// same underlying object, regardless of structural equality.
///
/// Every accessor returns `None` for a handle the plan does not know about
/// (or, for [`PlanGraph::ranges_over`], for a quantifier that is not bound yet).
/// Consumers treat `None` as a malformed plan.
pub trait PlanGraph {
    type Ref: Copy + Eq + Hash + fmt::Debug;
    type Expr: Copy + Eq + Hash + fmt::Debug;
    type Quantifier: Copy + Eq + Hash + fmt::Debug;

    /// Member expressions (variants) of a reference, in unspecified order.
    fn members(&self, reference: Self::Ref) -> Option<&[Self::Expr]>;

    /// Quantifiers of an expression, in unspecified order.
    fn quantifiers(&self, expression: Self::Expr) -> Option<&[Self::Quantifier]>;

    /// The reference a quantifier ranges over.
    fn ranges_over(&self, quantifier: Self::Quantifier) -> Option<Self::Ref>;

    /// Current mutation generation, if the plan tracks one.
    fn generation(&self) -> Option<PlanGeneration> {
        None
    }
}

impl<P: PlanGraph + ?Sized> PlanGraph for &P {
    type Ref = P::Ref;
    type Expr = P::Expr;
    type Quantifier = P::Quantifier;

    fn members(&self, reference: Self::Ref) -> Option<&[Self::Expr]> {
        (**self).members(reference)
    }

    fn quantifiers(&self, expression: Self::Expr) -> Option<&[Self::Quantifier]> {
        (**self).quantifiers(expression)
    }

    fn ranges_over(&self, quantifier: Self::Quantifier) -> Option<Self::Ref> {
        (**self).ranges_over(quantifier)
    }

    fn generation(&self) -> Option<PlanGeneration> {
        (**self).generation()
    }
}
