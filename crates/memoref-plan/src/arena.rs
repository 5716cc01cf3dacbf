//! Arena-backed plan model.
//!
//! References, expressions and quantifiers live in flat tables and are named by
//! compact `u32` handles. Handle equality is object identity: two references
//! with identical members are still distinct nodes.
//!
//! Ownership mirrors the optimizer's memo structure:
//!
//! - a reference owns its member expressions,
//! - an expression owns its quantifiers,
//! - a quantifier *points at* (does not own) the reference it ranges over.
//!
//! Nothing is ever removed; the arena is append-only apart from binding
//! quantifiers that were created unbound.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};
use crate::token::{PlanGeneration, PlanToken};
use crate::PlanGraph;

macro_rules! plan_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

plan_handle!(
    /// Handle of a reference (a memo slot of interchangeable expressions).
    RefId,
    "r"
);
plan_handle!(
    /// Handle of an expression (one plan operator variant).
    ExprId,
    "e"
);
plan_handle!(
    /// Handle of a quantifier (an expression's binding over a reference).
    QuantifierId,
    "q"
);

/// How a quantifier consumes the reference it ranges over.
///
/// Traversal treats every kind the same; the kind is carried for rule engines
/// and for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantifierKind {
    /// Iterates every record produced by the reference.
    #[default]
    ForEach,
    /// Only tests whether the reference produces any record.
    Existential,
    /// Ranges over a physical (already planned) reference.
    Physical,
}

impl QuantifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForEach => "for_each",
            Self::Existential => "existential",
            Self::Physical => "physical",
        }
    }
}

#[derive(Debug, Default)]
struct RefSlot {
    members: Vec<ExprId>,
}

#[derive(Debug)]
struct ExprSlot {
    owner: RefId,
    operator: String,
    quantifiers: Vec<QuantifierId>,
}

#[derive(Debug)]
struct QuantifierSlot {
    owner: ExprId,
    alias: String,
    kind: QuantifierKind,
    ranges_over: Option<RefId>,
}

/// In-memory plan made of handle-addressed tables.
///
/// Every mutating call bumps the arena's generation counter so snapshots built
/// from an earlier state can detect that they are stale.
#[derive(Debug)]
pub struct PlanArena {
    token: PlanToken,
    counter: u64,
    refs: Vec<RefSlot>,
    exprs: Vec<ExprSlot>,
    quantifiers: Vec<QuantifierSlot>,
}

impl PlanArena {
    pub fn new() -> Self {
        Self {
            token: PlanToken::new(),
            counter: 0,
            refs: Vec::new(),
            exprs: Vec::new(),
            quantifiers: Vec::new(),
        }
    }

    pub fn token(&self) -> PlanToken {
        self.token
    }

    /// The arena's current `(token, counter)` state.
    pub fn current_generation(&self) -> PlanGeneration {
        PlanGeneration::new(self.token, self.counter)
    }

    fn bump(&mut self) {
        self.counter += 1;
    }

    /// Add an empty reference.
    pub fn add_ref(&mut self) -> RefId {
        let id = RefId(self.refs.len() as u32);
        self.refs.push(RefSlot::default());
        self.bump();
        id
    }

    /// Add a member expression to `owner`.
    pub fn add_expr(&mut self, owner: RefId, operator: impl Into<String>) -> PlanResult<ExprId> {
        let id = ExprId(self.exprs.len() as u32);
        self.refs
            .get_mut(owner.index())
            .ok_or(PlanError::UnknownRef(owner))?
            .members
            .push(id);
        self.exprs.push(ExprSlot {
            owner,
            operator: operator.into(),
            quantifiers: Vec::new(),
        });
        self.bump();
        Ok(id)
    }

    /// Add a quantifier to `owner` that ranges over `ranges_over`.
    pub fn add_quantifier(
        &mut self,
        owner: ExprId,
        alias: impl Into<String>,
        kind: QuantifierKind,
        ranges_over: RefId,
    ) -> PlanResult<QuantifierId> {
        if ranges_over.index() >= self.refs.len() {
            return Err(PlanError::UnknownRef(ranges_over));
        }
        self.push_quantifier(owner, alias.into(), kind, Some(ranges_over))
    }

    /// Add a quantifier that does not range over anything yet.
    ///
    /// Building a traversal over a plan that still contains an unbound
    /// quantifier fails; bind it first with [`PlanArena::bind`].
    pub fn add_unbound_quantifier(
        &mut self,
        owner: ExprId,
        alias: impl Into<String>,
        kind: QuantifierKind,
    ) -> PlanResult<QuantifierId> {
        self.push_quantifier(owner, alias.into(), kind, None)
    }

    fn push_quantifier(
        &mut self,
        owner: ExprId,
        alias: String,
        kind: QuantifierKind,
        ranges_over: Option<RefId>,
    ) -> PlanResult<QuantifierId> {
        let id = QuantifierId(self.quantifiers.len() as u32);
        self.exprs
            .get_mut(owner.index())
            .ok_or(PlanError::UnknownExpr(owner))?
            .quantifiers
            .push(id);
        self.quantifiers.push(QuantifierSlot {
            owner,
            alias,
            kind,
            ranges_over,
        });
        self.bump();
        Ok(id)
    }

    /// Bind an unbound quantifier to the reference it ranges over.
    pub fn bind(&mut self, quantifier: QuantifierId, reference: RefId) -> PlanResult<()> {
        if reference.index() >= self.refs.len() {
            return Err(PlanError::UnknownRef(reference));
        }
        let slot = self
            .quantifiers
            .get_mut(quantifier.index())
            .ok_or(PlanError::UnknownQuantifier(quantifier))?;
        if let Some(current) = slot.ranges_over {
            return Err(PlanError::AlreadyBound {
                quantifier,
                current,
            });
        }
        slot.ranges_over = Some(reference);
        self.bump();
        Ok(())
    }

    pub fn contains_ref(&self, reference: RefId) -> bool {
        reference.index() < self.refs.len()
    }

    pub fn ref_ids(&self) -> impl Iterator<Item = RefId> + '_ {
        (0..self.refs.len() as u32).map(RefId)
    }

    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn quantifier_count(&self) -> usize {
        self.quantifiers.len()
    }

    pub fn operator(&self, expression: ExprId) -> Option<&str> {
        self.exprs
            .get(expression.index())
            .map(|e| e.operator.as_str())
    }

    pub fn owner_of_expr(&self, expression: ExprId) -> Option<RefId> {
        self.exprs.get(expression.index()).map(|e| e.owner)
    }

    pub fn alias(&self, quantifier: QuantifierId) -> Option<&str> {
        self.quantifiers
            .get(quantifier.index())
            .map(|q| q.alias.as_str())
    }

    pub fn kind(&self, quantifier: QuantifierId) -> Option<QuantifierKind> {
        self.quantifiers.get(quantifier.index()).map(|q| q.kind)
    }

    pub fn owner_of_quantifier(&self, quantifier: QuantifierId) -> Option<ExprId> {
        self.quantifiers.get(quantifier.index()).map(|q| q.owner)
    }
}

impl Default for PlanArena {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanGraph for PlanArena {
    type Ref = RefId;
    type Expr = ExprId;
    type Quantifier = QuantifierId;

    fn members(&self, reference: RefId) -> Option<&[ExprId]> {
        self.refs
            .get(reference.index())
            .map(|r| r.members.as_slice())
    }

    fn quantifiers(&self, expression: ExprId) -> Option<&[QuantifierId]> {
        self.exprs
            .get(expression.index())
            .map(|e| e.quantifiers.as_slice())
    }

    fn ranges_over(&self, quantifier: QuantifierId) -> Option<RefId> {
        self.quantifiers
            .get(quantifier.index())
            .and_then(|q| q.ranges_over)
    }

    fn generation(&self) -> Option<PlanGeneration> {
        Some(self.current_generation())
    }
}
