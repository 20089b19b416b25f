//! Step identifiers, statuses and descriptors.

use std::fmt;

use serde::Serialize;

use crate::error::TransactionError;

use super::guard::{GuardResult, SuggestedAction};

/// The four step kinds, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepId {
    Form,
    FeeSelection,
    Approve,
    Execute,
}

impl StepId {
    /// All step kinds in flow order.
    pub const ALL: [StepId; 4] = [
        StepId::Form,
        StepId::FeeSelection,
        StepId::Approve,
        StepId::Execute,
    ];

    /// Stable identifier used in logs and serialized state.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Form => "form",
            StepId::FeeSelection => "feeSelection",
            StepId::Approve => "approve",
            StepId::Execute => "execute",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

/// Observable state of one external single-shot operation.
///
/// Mirrors the `is_pending` / `is_success` / `error` triple exposed by a
/// transaction executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionState {
    pub status: StepStatus,
    pub error: Option<TransactionError>,
    pub tx_hash: Option<String>,
}

impl ExecutionState {
    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    /// Back to idle, dropping any previous error or hash.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn start(&mut self) {
        self.status = StepStatus::Pending;
        self.error = None;
        self.tx_hash = None;
    }

    pub(crate) fn succeed(&mut self, tx_hash: Option<String>) {
        self.status = StepStatus::Success;
        self.error = None;
        self.tx_hash = tx_hash;
    }

    pub(crate) fn fail(&mut self, error: TransactionError) {
        self.status = StepStatus::Error;
        self.error = Some(error);
        self.tx_hash = None;
    }
}

/// One entry of the ordered step list.
///
/// Rebuilt from scratch on every recomputation; never mutated in place.
/// Run a step through [`Flow::run`](crate::Flow::run) with its [`id`](Self::id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    pub id: StepId,
    pub label: String,
    pub status: StepStatus,
    pub is_disabled: bool,
    pub disabled_reason: Option<String>,
    /// Remedy for `disabled_reason`, when the user can do something about it
    pub suggested_action: Option<SuggestedAction>,
    pub guard: GuardResult,
    pub error: Option<TransactionError>,
}

impl StepDescriptor {
    /// The guard verdict this descriptor was built with.
    pub fn guard(&self) -> &GuardResult {
        &self.guard
    }

    /// Whether the step reached terminal success.
    pub fn is_complete(&self) -> bool {
        self.status == StepStatus::Success
    }

    /// Whether the user can act on this step right now.
    pub fn is_actionable(&self) -> bool {
        !self.is_disabled && matches!(self.status, StepStatus::Idle | StepStatus::Error)
    }
}
