use thiserror::Error;

pub type TraversalResult<T> = std::result::Result<T, TraversalError>;

/// Errors raised while building or querying a traversal snapshot.
///
/// Handles are generic, so offending handles are carried in their `Debug` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    /// The plan's containment structure could not be walked (unknown handle or
    /// unbound quantifier). The build is aborted.
    #[error("malformed plan graph: {detail}")]
    MalformedPlanGraph { detail: String },

    /// A reference that is not a node of the snapshot, i.e. not reachable from
    /// the root the snapshot was built from.
    #[error("reference {reference} is not part of this traversal (unreachable from root {root})")]
    UnknownReference { reference: String, root: String },

    /// The plan changed (or is a different plan) since the snapshot was built.
    #[error("stale traversal: built at {built}, plan is now at {current}")]
    StaleSnapshot { built: String, current: String },
}
