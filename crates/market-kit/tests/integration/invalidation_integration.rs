//! Approval invalidation across input changes.

use market_kit::*;

use crate::mocks::*;

async fn approved_listing() -> Harness {
    let generator = MockGenerator::new()
        .with_approval_for(usdc().address)
        .with_approval_for(weth().address);
    let h = harness(FlowKind::Listing, generator);
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");
    h.flow.refresh_payload().await.unwrap();
    h.flow.run(StepId::Approve).await.unwrap();
    h
}

#[tokio::test]
async fn test_currency_change_requires_reapproval() {
    let h = approved_listing().await;
    assert!(h.flow.state().step(StepId::Approve).unwrap().is_complete());

    h.flow.set_currency(weth());
    let state = h.flow.state();

    let approve = state.step(StepId::Approve).unwrap();
    assert_eq!(approve.status, StepStatus::Idle);
    assert_eq!(approve.label, "Re-approve");
    assert!(state.invalidation_reason.as_deref().unwrap().contains("Currency"));

    // Price text is re-parsed at the new scale
    assert_eq!(h.flow.price_in_smallest_unit(), "1000000000000000000");

    h.flow.refresh_payload().await.unwrap();
    let execute = h.flow.state().step(StepId::Execute).cloned().unwrap();
    assert_eq!(
        execute.suggested_action,
        Some(SuggestedAction::CompleteApproval)
    );

    h.flow.run(StepId::Approve).await.unwrap();
    let state = h.flow.state();
    assert_eq!(state.invalidation_reason, None);
    assert_eq!(state.step(StepId::Approve).unwrap().label, "Approve");

    h.flow.run(StepId::Execute).await.unwrap();
    assert_eq!(h.executor.approvals().len(), 2);
    assert_eq!(h.flow.state().aggregate_status, StepStatus::Success);
}

#[tokio::test]
async fn test_same_currency_keeps_approval() {
    let h = approved_listing().await;
    h.flow.set_currency(usdc());
    h.flow.set_price("3");

    let state = h.flow.state();
    assert!(state.step(StepId::Approve).unwrap().is_complete());
    assert_eq!(state.invalidation_reason, None);
}

#[tokio::test]
async fn test_invalidation_reported_once() {
    let h = approved_listing().await;
    let mut rx = h.flow.subscribe();
    rx.borrow_and_update();

    h.flow.set_currency(weth());
    let first = rx.borrow_and_update().clone();
    assert!(first.invalidation_reason.is_some());

    // Switching back leaves nothing to invalidate and nothing to explain
    h.flow.set_currency(usdc());
    let state = h.flow.state();
    assert_eq!(state.invalidation_reason, None);
    let approve = state.step(StepId::Approve).unwrap();
    assert_eq!(approve.status, StepStatus::Idle);
    assert_eq!(approve.label, "Approve");
}

#[tokio::test]
async fn test_currency_change_while_approval_pending() {
    let generator = MockGenerator::new()
        .with_approval_for(usdc().address)
        .with_approval_for(weth().address);
    let h = harness(FlowKind::Listing, generator);
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");
    h.flow.refresh_payload().await.unwrap();

    let gate = h.executor.gated();
    let (outcome, ()) = tokio::join!(h.flow.run(StepId::Approve), async {
        tokio::task::yield_now().await;
        h.flow.set_currency(weth());
        assert_eq!(
            h.flow.state().step(StepId::Approve).unwrap().status,
            StepStatus::Pending
        );
        gate.notify_one();
    });
    assert!(outcome.unwrap().tx_hash.is_some());

    // The approval covered USDC, so it is void as soon as it lands
    let state = h.flow.state();
    let approve = state.step(StepId::Approve).unwrap();
    assert_eq!(approve.status, StepStatus::Idle);
    assert_eq!(approve.label, "Re-approve");
    assert!(state.invalidation_reason.as_deref().unwrap().contains("Currency"));
    assert!(!state.step(StepId::Execute).unwrap().guard().can_proceed);
}

#[tokio::test]
async fn test_approval_kept_visible_when_no_longer_needed() {
    let h = harness(
        FlowKind::Listing,
        MockGenerator::new().with_approval_for(usdc().address),
    );
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");
    h.flow.refresh_payload().await.unwrap();
    h.flow.run(StepId::Approve).await.unwrap();

    // WETH payloads need no approval, but the completed step stays listed
    h.flow.set_currency(weth());
    h.flow.refresh_payload().await.unwrap();
    let state = h.flow.state();
    let approve = state.step(StepId::Approve).unwrap();
    assert!(approve.is_complete());
    assert_eq!(
        approve.disabled_reason.as_deref(),
        Some("No approval needed for this order")
    );
    assert_eq!(state.next_step, Some(StepId::Execute));

    let err = h.flow.run(StepId::Approve).await.unwrap_err();
    assert!(err.is_guard_violation());
    h.flow.run(StepId::Execute).await.unwrap();
    assert_eq!(h.flow.state().aggregate_status, StepStatus::Success);
}
