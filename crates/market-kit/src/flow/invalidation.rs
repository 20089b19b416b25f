//! Approval invalidation tracking.
//!
//! An approval is granted for a specific currency and collection. When either
//! changes after the approval succeeded, the approval no longer covers the
//! order and has to be redone.

use serde::Serialize;
use tracing::warn;

use crate::types::Address;

use super::step::ExecutionState;

/// Dependencies an approval was granted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ApprovalDependencySnapshot {
    pub currency: Address,
    pub collection: Address,
}

impl ApprovalDependencySnapshot {
    pub fn new(currency: Address, collection: Address) -> Self {
        Self {
            currency,
            collection,
        }
    }
}

/// Whether a completed approval was invalidated by a dependency change.
///
/// Always false when no approval has completed.
pub fn is_invalidated(
    prev: &ApprovalDependencySnapshot,
    current: &ApprovalDependencySnapshot,
    approval_completed: bool,
) -> bool {
    approval_completed
        && (prev.currency != current.currency || prev.collection != current.collection)
}

/// Human explanation naming the first differing dependency (currency first).
pub fn reason_for(
    prev: &ApprovalDependencySnapshot,
    current: &ApprovalDependencySnapshot,
) -> Option<String> {
    if prev.currency != current.currency {
        Some(format!(
            "Currency changed from {} to {}, approval must be renewed",
            prev.currency, current.currency
        ))
    } else if prev.collection != current.collection {
        Some(format!(
            "Collection changed from {} to {}, approval must be renewed",
            prev.collection, current.collection
        ))
    } else {
        None
    }
}

/// Emitted once per detected invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationEvent {
    pub previous: ApprovalDependencySnapshot,
    pub current: ApprovalDependencySnapshot,
    pub reason: String,
}

/// Owns the snapshot taken when an approval last succeeded.
#[derive(Debug, Clone, Default)]
pub struct ApprovalTracker {
    snapshot: Option<ApprovalDependencySnapshot>,
    reason: Option<String>,
}

impl ApprovalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot from the last successful approval or invalidation reset.
    pub fn snapshot(&self) -> Option<&ApprovalDependencySnapshot> {
        self.snapshot.as_ref()
    }

    /// Reason of the last invalidation. Cleared by a fresh approval, or once
    /// the dependencies move away from the ones it was recorded against.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Record a successful approval for the dependencies it was submitted with.
    pub fn record_approval(&mut self, snapshot: ApprovalDependencySnapshot) {
        self.snapshot = Some(snapshot);
        self.reason = None;
    }

    /// Compare against `current`; on invalidation reset `approval` to idle and
    /// advance the snapshot so the same change is reported only once.
    pub fn observe(
        &mut self,
        current: ApprovalDependencySnapshot,
        approval: &mut ExecutionState,
    ) -> Option<InvalidationEvent> {
        let previous = self.snapshot?;
        if self.reason.is_some() && previous != current {
            self.reason = None;
        }
        if !is_invalidated(&previous, &current, approval.is_success()) {
            return None;
        }
        let reason = reason_for(&previous, &current)?;

        warn!(
            previous_currency = %previous.currency,
            current_currency = %current.currency,
            previous_collection = %previous.collection,
            current_collection = %current.collection,
            "Approval invalidated"
        );

        approval.reset();
        self.snapshot = Some(current);
        self.reason = Some(reason.clone());

        Some(InvalidationEvent {
            previous,
            current,
            reason,
        })
    }
}
