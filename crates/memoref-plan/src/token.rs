//! Runtime identity for plan instances.
//!
//! A traversal snapshot is a point-in-time copy of a plan's structure. Rust
//! cannot tie the snapshot to "this plan, in this state" at the type level, so
//! we do it at runtime:
//!
//! - every `PlanArena` gets a fresh `PlanToken`,
//! - every mutation bumps the arena's counter,
//! - the `(token, counter)` pair is a `PlanGeneration` that snapshots record
//!   and can compare later.
//!
//! This is process-local and intentionally **not** serialized.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PLAN_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A process-local token identifying one plan instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanToken(NonZeroU64);

impl PlanToken {
    pub fn new() -> Self {
        let raw = NEXT_PLAN_TOKEN.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl Default for PlanToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlanToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan#{}", self.raw())
    }
}

/// One observed state of a plan: which plan, and how many mutations it had seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanGeneration {
    pub token: PlanToken,
    pub counter: u64,
}

impl PlanGeneration {
    pub fn new(token: PlanToken, counter: u64) -> Self {
        Self { token, counter }
    }
}

impl fmt::Display for PlanGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.token, self.counter)
    }
}
