//! Step guards.
//!
//! Each guard is a pure function of a boolean snapshot. Checks run in a fixed
//! priority order; the first failing check alone decides `reason` and
//! `suggested_action`, so the user only ever sees one blocking complaint.
//! `failed_checks` still lists every failure for diagnostics.

use serde::Serialize;

use crate::validation::FormValidation;

pub const CONNECT_WALLET: &str = "Connect your wallet to continue";
pub const FIX_FORM: &str = "Fix the highlighted fields to continue";
pub const WAIT_FOR_TX: &str = "Waiting for the transaction to be prepared";
pub const COMPLETE_APPROVAL: &str = "Approve the marketplace contract first";
pub const RE_APPROVE: &str = "Approval no longer covers this order, approve again";
pub const SELECT_FEE: &str = "Select how to pay the network fee";

/// What the user should do to unblock a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestedAction {
    ConnectWallet,
    FixForm,
    WaitForTx,
    CompleteApproval,
    ReApprove,
    SelectFee,
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardCheck {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
}

/// Verdict of a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardResult {
    pub can_proceed: bool,
    pub reason: Option<String>,
    pub failed_checks: Vec<GuardCheck>,
    pub suggested_action: Option<SuggestedAction>,
}

impl GuardResult {
    /// A passing verdict.
    pub fn pass() -> Self {
        Self {
            can_proceed: true,
            reason: None,
            failed_checks: Vec::new(),
            suggested_action: None,
        }
    }

    /// Build from checks listed in priority order.
    fn evaluate(checks: Vec<Check>) -> Self {
        let mut result = Self::pass();
        for check in checks.into_iter().filter(|c| !c.passed) {
            if result.can_proceed {
                result.can_proceed = false;
                result.reason = Some(check.message.clone());
                result.suggested_action = Some(check.action);
            }
            result.failed_checks.push(GuardCheck {
                name: check.name,
                passed: false,
                message: check.message,
            });
        }
        result
    }
}

struct Check {
    name: &'static str,
    passed: bool,
    message: String,
    action: SuggestedAction,
}

impl Check {
    fn new(name: &'static str, passed: bool, message: &str, action: SuggestedAction) -> Self {
        Self {
            name,
            passed,
            message: message.to_string(),
            action,
        }
    }
}

/// Boolean snapshot the approve, execute and fee-selection guards read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardInput {
    pub wallet_connected: bool,
    pub form_valid: bool,
    pub tx_payload_ready: bool,
    pub approval_required: bool,
    pub approval_complete: bool,
    pub invalidated: bool,
    pub fee_selected: bool,
}

/// Form guard: fails iff the form is invalid, listing every invalid field.
pub fn form_guard(validation: &FormValidation) -> GuardResult {
    GuardResult::evaluate(
        validation
            .invalid_fields()
            .into_iter()
            .map(|(name, message)| Check {
                name,
                passed: false,
                message,
                action: SuggestedAction::FixForm,
            })
            .collect(),
    )
}

/// Approve guard: wallet, then form, then payload.
pub fn approve_guard(input: &GuardInput) -> GuardResult {
    GuardResult::evaluate(vec![
        Check::new(
            "walletConnected",
            input.wallet_connected,
            CONNECT_WALLET,
            SuggestedAction::ConnectWallet,
        ),
        Check::new("isFormValid", input.form_valid, FIX_FORM, SuggestedAction::FixForm),
        Check::new(
            "txPayloadReady",
            input.tx_payload_ready,
            WAIT_FOR_TX,
            SuggestedAction::WaitForTx,
        ),
    ])
}

/// Execute guard: wallet, form, payload, approval, then invalidation.
///
/// The approval check passes trivially when no approval is required.
pub fn execute_guard(input: &GuardInput) -> GuardResult {
    GuardResult::evaluate(vec![
        Check::new(
            "walletConnected",
            input.wallet_connected,
            CONNECT_WALLET,
            SuggestedAction::ConnectWallet,
        ),
        Check::new("isFormValid", input.form_valid, FIX_FORM, SuggestedAction::FixForm),
        Check::new(
            "txPayloadReady",
            input.tx_payload_ready,
            WAIT_FOR_TX,
            SuggestedAction::WaitForTx,
        ),
        Check::new(
            "approvalComplete",
            !input.approval_required || input.approval_complete,
            COMPLETE_APPROVAL,
            SuggestedAction::CompleteApproval,
        ),
        Check::new(
            "notInvalidated",
            !input.invalidated,
            RE_APPROVE,
            SuggestedAction::ReApprove,
        ),
    ])
}

/// Fee-selection guard: wallet, then a chosen fee option.
pub fn fee_selection_guard(input: &GuardInput) -> GuardResult {
    GuardResult::evaluate(vec![
        Check::new(
            "walletConnected",
            input.wallet_connected,
            CONNECT_WALLET,
            SuggestedAction::ConnectWallet,
        ),
        Check::new(
            "feeSelected",
            input.fee_selected,
            SELECT_FEE,
            SuggestedAction::SelectFee,
        ),
    ])
}
