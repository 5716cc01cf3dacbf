//! Serializable plan descriptions.
//!
//! A `PlanDescription` names references instead of using handles, so plans can
//! be written by hand (test fixtures, debugging dumps) and lowered into a
//! [`PlanArena`]:
//!
//! ```json
//! {
//!   "root": "top",
//!   "refs": [
//!     { "name": "top",  "members": [ { "operator": "Filter",
//!                                      "quantifiers": [ { "alias": "s", "over": "scan" } ] } ] },
//!     { "name": "scan", "members": [ { "operator": "Scan" } ] }
//!   ]
//! }
//! ```
//!
//! A quantifier without `over` is created unbound.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::arena::{PlanArena, QuantifierKind, RefId};
use crate::error::{PlanError, PlanResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDescription {
    pub root: String,
    pub refs: Vec<RefDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefDescription {
    pub name: String,
    #[serde(default)]
    pub members: Vec<ExprDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprDescription {
    pub operator: String,
    #[serde(default)]
    pub quantifiers: Vec<QuantifierDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantifierDescription {
    pub alias: String,
    #[serde(default)]
    pub kind: QuantifierKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over: Option<String>,
}

/// An arena lowered from a description, with its name table.
#[derive(Debug)]
pub struct BuiltPlan {
    pub arena: PlanArena,
    pub root: RefId,
    ids_by_name: AHashMap<String, RefId>,
    names: Vec<String>,
}

impl BuiltPlan {
    /// Handle of the reference declared as `name`.
    pub fn ref_id(&self, name: &str) -> Option<RefId> {
        self.ids_by_name.get(name).copied()
    }

    /// Declared name of a reference.
    pub fn name_of(&self, reference: RefId) -> Option<&str> {
        self.names.get(reference.raw() as usize).map(String::as_str)
    }
}

impl PlanDescription {
    pub fn from_json(text: &str) -> PlanResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> PlanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Lower the description into a fresh arena.
    ///
    /// References are created in declaration order, so the i-th declared
    /// reference gets `RefId::new(i)`.
    pub fn build(&self) -> PlanResult<BuiltPlan> {
        let mut arena = PlanArena::new();
        let mut ids_by_name: AHashMap<String, RefId> = AHashMap::new();
        let mut names = Vec::with_capacity(self.refs.len());

        for r in &self.refs {
            if ids_by_name.contains_key(&r.name) {
                return Err(PlanError::DuplicateRef(r.name.clone()));
            }
            let id = arena.add_ref();
            ids_by_name.insert(r.name.clone(), id);
            names.push(r.name.clone());
        }

        let root = *ids_by_name
            .get(&self.root)
            .ok_or_else(|| PlanError::UndefinedRef {
                name: self.root.clone(),
                context: "plan root".to_string(),
            })?;

        for r in &self.refs {
            let owner = ids_by_name[&r.name];
            for member in &r.members {
                let expr = arena.add_expr(owner, member.operator.clone())?;
                for q in &member.quantifiers {
                    match &q.over {
                        Some(target) => {
                            let over = *ids_by_name.get(target).ok_or_else(|| {
                                PlanError::UndefinedRef {
                                    name: target.clone(),
                                    context: format!("quantifier `{}` of `{}`", q.alias, r.name),
                                }
                            })?;
                            arena.add_quantifier(expr, q.alias.clone(), q.kind, over)?;
                        }
                        None => {
                            arena.add_unbound_quantifier(expr, q.alias.clone(), q.kind)?;
                        }
                    }
                }
            }
        }

        Ok(BuiltPlan {
            arena,
            root,
            ids_by_name,
            names,
        })
    }
}
