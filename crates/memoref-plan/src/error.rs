use thiserror::Error;

use crate::arena::{ExprId, QuantifierId, RefId};

pub type PlanResult<T> = std::result::Result<T, PlanError>;

/// Errors raised while assembling a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unknown reference {0}")]
    UnknownRef(RefId),

    #[error("unknown expression {0}")]
    UnknownExpr(ExprId),

    #[error("unknown quantifier {0}")]
    UnknownQuantifier(QuantifierId),

    #[error("quantifier {quantifier} already ranges over {current}")]
    AlreadyBound {
        quantifier: QuantifierId,
        current: RefId,
    },

    #[error("reference `{0}` is defined more than once")]
    DuplicateRef(String),

    #[error("reference `{name}` is not defined (used by {context})")]
    UndefinedRef { name: String, context: String },

    #[error("invalid plan description: {0}")]
    Json(#[from] serde_json::Error),
}
