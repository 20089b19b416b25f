//! Pure step assembly and flow-state derivation.
//!
//! [`recompute`] turns a [`FlowSnapshot`] into a [`FlowState`]. It has no side
//! effects and is the only place that decides which steps exist, in which
//! order, and which one is current.

use serde::Serialize;

use crate::config::StepLabels;
use crate::error::TransactionError;
use crate::types::FlowKind;
use crate::validation::FormValidation;

use super::guard::{
    GuardInput, GuardResult, SELECT_FEE, SuggestedAction, approve_guard, execute_guard,
    fee_selection_guard, form_guard,
};
use super::step::{ExecutionState, StepDescriptor, StepId, StepStatus};

pub const IN_PROGRESS: &str = "Transaction in progress";
pub const OTHER_IN_PROGRESS: &str = "Another step is in progress";
pub const ALREADY_COMPLETE: &str = "Already completed";
pub const APPROVAL_NOT_NEEDED: &str = "No approval needed for this order";

/// Everything [`recompute`] reads.
#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    pub kind: FlowKind,
    pub labels: StepLabels,
    pub validation: FormValidation,
    pub wallet_connected: bool,
    pub wallet_supports_fee_sponsorship: bool,
    /// Fee sponsored automatically or confirmed by the user
    pub fee_resolved: bool,
    /// A fee option is chosen but not yet confirmed
    pub fee_selected: bool,
    /// A payload exists for exactly the current order parameters
    pub tx_payload_ready: bool,
    /// That payload contains an approval sub-step
    pub payload_requires_approval: bool,
    pub approval: ExecutionState,
    pub approved_in_session: bool,
    pub approval_invalidated: bool,
    pub invalidation_reason: Option<String>,
    pub execute: ExecutionState,
    pub payload_error: Option<String>,
}

/// Derived view of a flow. Never stored; recompute it instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub steps: Vec<StepDescriptor>,
    pub current_step: Option<StepId>,
    pub next_step: Option<StepId>,
    pub progress_percent: u8,
    pub aggregate_status: StepStatus,
    pub payload_error: Option<String>,
    pub invalidation_reason: Option<String>,
}

impl FlowState {
    /// Derive current/next step, progress and aggregate status from steps
    /// already in flow order.
    pub fn from_steps(steps: Vec<StepDescriptor>) -> Self {
        let current_step = steps.iter().find(|s| !s.is_complete()).map(|s| s.id);

        let next_step = steps
            .iter()
            .find(|s| s.is_actionable())
            .or_else(|| steps.iter().find(|s| s.status == StepStatus::Pending))
            .map(|s| s.id);

        let total = steps.len();
        let done = steps.iter().filter(|s| s.is_complete()).count();
        let progress_percent = if total == 0 {
            0
        } else {
            ((200 * done + total) / (2 * total)) as u8
        };

        let has = |status: StepStatus| steps.iter().any(|s| s.status == status);
        let aggregate_status = if has(StepStatus::Pending) {
            StepStatus::Pending
        } else if has(StepStatus::Error) {
            StepStatus::Error
        } else if total > 0 && done == total {
            StepStatus::Success
        } else {
            StepStatus::Idle
        };

        Self {
            steps,
            current_step,
            next_step,
            progress_percent,
            aggregate_status,
            payload_error: None,
            invalidation_reason: None,
        }
    }

    /// Look up a step by id.
    pub fn step(&self, id: StepId) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Whether a step is part of the flow right now.
    pub fn contains(&self, id: StepId) -> bool {
        self.step(id).is_some()
    }

    /// Step ids in order.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id).collect()
    }
}

/// Assemble the ordered step list and derive the flow state.
pub fn recompute(snapshot: &FlowSnapshot) -> FlowState {
    let form_valid = snapshot.validation.is_valid();
    let input = GuardInput {
        wallet_connected: snapshot.wallet_connected,
        form_valid,
        tx_payload_ready: snapshot.tx_payload_ready,
        approval_required: snapshot.payload_requires_approval,
        approval_complete: snapshot.approval.is_success(),
        invalidated: snapshot.approval_invalidated,
        fee_selected: snapshot.fee_selected,
    };

    let include_fee = snapshot.wallet_supports_fee_sponsorship && !snapshot.fee_resolved;
    let include_approve =
        snapshot.payload_requires_approval || !form_valid || snapshot.approved_in_session;
    let in_flight = snapshot.approval.is_pending() || snapshot.execute.is_pending();

    let labels = &snapshot.labels;
    let mut drafts = vec![Draft {
        id: StepId::Form,
        label: labels.form.clone(),
        status: if form_valid {
            StepStatus::Success
        } else {
            StepStatus::Idle
        },
        guard: form_guard(&snapshot.validation),
        error: None,
        complete_reason: ALREADY_COMPLETE,
    }];

    if include_fee {
        drafts.push(Draft {
            id: StepId::FeeSelection,
            label: labels.fee_selection.clone(),
            status: StepStatus::Idle,
            guard: fee_selection_guard(&input),
            error: None,
            complete_reason: ALREADY_COMPLETE,
        });
    }

    if include_approve {
        let label = if snapshot.invalidation_reason.is_some() {
            &labels.re_approve
        } else {
            &labels.approve
        };
        // Kept only for continuity: a fresh payload without an approval
        // sub-step satisfies the step
        let not_needed = form_valid
            && snapshot.tx_payload_ready
            && !snapshot.payload_requires_approval
            && snapshot.approval.status == StepStatus::Idle;
        drafts.push(Draft {
            id: StepId::Approve,
            label: label.clone(),
            status: if not_needed {
                StepStatus::Success
            } else {
                snapshot.approval.status
            },
            guard: approve_guard(&input),
            error: snapshot.approval.error.clone(),
            complete_reason: if not_needed {
                APPROVAL_NOT_NEEDED
            } else {
                ALREADY_COMPLETE
            },
        });
    }

    drafts.push(Draft {
        id: StepId::Execute,
        label: labels.execute(snapshot.kind).to_string(),
        status: snapshot.execute.status,
        guard: execute_guard(&input),
        error: snapshot.execute.error.clone(),
        complete_reason: ALREADY_COMPLETE,
    });

    let steps = drafts
        .into_iter()
        .map(|draft| draft.finish(in_flight, include_fee))
        .collect();

    let mut state = FlowState::from_steps(steps);
    state.payload_error = snapshot.payload_error.clone();
    state.invalidation_reason = snapshot.invalidation_reason.clone();
    state
}

struct Draft {
    id: StepId,
    label: String,
    status: StepStatus,
    guard: GuardResult,
    error: Option<TransactionError>,
    complete_reason: &'static str,
}

impl Draft {
    fn finish(self, in_flight: bool, fee_pending: bool) -> StepDescriptor {
        let on_chain = matches!(self.id, StepId::Approve | StepId::Execute);

        let (disabled_reason, suggested_action) = if self.status == StepStatus::Pending {
            (Some(IN_PROGRESS.to_string()), None)
        } else if in_flight {
            (Some(OTHER_IN_PROGRESS.to_string()), None)
        } else if on_chain && self.status == StepStatus::Success {
            (Some(self.complete_reason.to_string()), None)
        } else if !self.guard.can_proceed {
            (self.guard.reason.clone(), self.guard.suggested_action)
        } else if on_chain && fee_pending {
            (Some(SELECT_FEE.to_string()), Some(SuggestedAction::SelectFee))
        } else {
            (None, None)
        };

        StepDescriptor {
            id: self.id,
            label: self.label,
            status: self.status,
            is_disabled: disabled_reason.is_some(),
            disabled_reason,
            suggested_action,
            guard: self.guard,
            error: self.error,
        }
    }
}
