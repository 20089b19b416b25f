//! End-to-end listing flows.

use market_kit::*;

use crate::mocks::*;

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_listing_without_approval() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1.5");

    assert_eq!(h.flow.price_in_smallest_unit(), "1500000");
    assert_eq!(h.flow.quantity_in_smallest_unit(), "1");

    assert!(h.flow.refresh_payload().await.unwrap());
    let request = h.generator.requests().pop().unwrap();
    assert_eq!(request.order.price, "1500000");
    assert_eq!(request.order.quantity, "1");
    assert_eq!(request.wallet, addr(WALLET));

    let state = h.flow.state();
    assert_eq!(state.step_ids(), vec![StepId::Form, StepId::Execute]);
    assert_eq!(state.next_step, Some(StepId::Execute));

    let outcome = h.flow.run(StepId::Execute).await.unwrap();
    assert!(outcome.tx_hash.unwrap().starts_with("0x"));
    assert_eq!(h.executor.executions().len(), 1);
    assert!(h.executor.approvals().is_empty());

    let state = h.flow.state();
    assert_eq!(state.aggregate_status, StepStatus::Success);
    assert_eq!(state.progress_percent, 100);
    assert_eq!(state.current_step, None);
}

#[tokio::test]
async fn test_listing_with_approval_runs_in_order() {
    let h = harness(
        FlowKind::Listing,
        MockGenerator::new().with_approval_for(usdc().address),
    );
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("2");
    h.flow.refresh_payload().await.unwrap();

    let state = h.flow.state();
    assert_eq!(
        state.step_ids(),
        vec![StepId::Form, StepId::Approve, StepId::Execute]
    );
    assert_eq!(state.progress_percent, 33);

    // Execute is blocked until approval completes
    let err = h.flow.run(StepId::Execute).await.unwrap_err();
    assert_eq!(err.suggested_action(), Some(SuggestedAction::CompleteApproval));
    assert!(h.executor.executions().is_empty());

    let mut ran = Vec::new();
    while let Some(step) = h.flow.state().next_step {
        h.flow.run(step).await.unwrap();
        ran.push(step);
    }
    assert_eq!(ran, vec![StepId::Approve, StepId::Execute]);

    // The approval sub-step went to approve, the rest to execute
    assert_eq!(h.executor.approvals().len(), 1);
    let executed = h.executor.executions().pop().unwrap();
    assert!(executed.iter().all(|s| !s.is_approval()));
}

#[tokio::test]
async fn test_market_data_sync_and_balance() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");
    h.flow.set_quantity("2");

    let data = StaticMarketData::new()
        .with_currency(usdc())
        .with_balance(addr(COLLECTION), DecimalValue::parse("1", 0));
    h.flow.sync_market_data(&data).await.unwrap();

    let validation = h.flow.validation();
    assert!(!validation.is_valid());
    let errors = validation.collect_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Insufficient balance"));

    let form = h.flow.state().step(StepId::Form).cloned().unwrap();
    assert_eq!(form.status, StepStatus::Idle);
    assert_eq!(form.guard().failed_checks[0].name, "balance");

    h.flow.set_quantity("1");
    assert!(h.flow.validation().is_valid());
}

#[tokio::test]
async fn test_market_data_failure_surfaces() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    let err = h
        .flow
        .sync_market_data(&StaticMarketData::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::NotFound { kind: "currency", .. })));
}

#[tokio::test]
async fn test_market_data_contract_type_mismatch() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    let data = StaticMarketData::new()
        .with_contract_type(ContractType::Erc721)
        .with_currency(usdc());

    let err = h.flow.sync_market_data(&data).await.unwrap_err();
    match err {
        Error::ContractTypeMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, ContractType::Erc1155);
            assert_eq!(actual, ContractType::Erc721);
        }
        other => panic!("Expected ContractTypeMismatch, got: {:?}", other),
    }
}

// =============================================================================
// Gating
// =============================================================================

#[tokio::test]
async fn test_run_without_wallet_is_guard_violation() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    h.flow.set_price("1");

    let err = h.flow.run(StepId::Execute).await.unwrap_err();
    match err {
        Error::GuardViolation(v) => {
            assert_eq!(v.step, StepId::Execute);
            assert_eq!(v.suggested_action, Some(SuggestedAction::ConnectWallet));
        }
        other => panic!("Expected GuardViolation, got: {:?}", other),
    }
    assert!(h.executor.executions().is_empty());
}

#[tokio::test]
async fn test_pending_step_blocks_everything() {
    let h = harness(
        FlowKind::Listing,
        MockGenerator::new().with_approval_for(usdc().address),
    );
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");
    h.flow.refresh_payload().await.unwrap();

    let gate = h.executor.gated();
    let (outcome, ()) = tokio::join!(h.flow.run(StepId::Approve), async {
        tokio::task::yield_now().await;

        let state = h.flow.state();
        assert_eq!(state.aggregate_status, StepStatus::Pending);
        assert!(state.steps.iter().all(|s| s.is_disabled));
        assert_eq!(state.next_step, Some(StepId::Approve));

        // A second run while pending is rejected before submission
        let err = h.flow.run(StepId::Execute).await.unwrap_err();
        assert!(err.is_guard_violation());

        gate.notify_one();
    });

    assert!(outcome.unwrap().tx_hash.is_some());
    assert_eq!(h.executor.approvals().len(), 1);
    assert!(h.executor.executions().is_empty());
}

#[tokio::test]
async fn test_rejected_execute_preserves_error() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");
    h.flow.refresh_payload().await.unwrap();

    h.executor
        .reject_with(Some(TransactionError::timeout("60s")));
    let err = h.flow.run(StepId::Execute).await.unwrap_err();
    assert!(matches!(err, Error::Transaction(_)));

    let state = h.flow.state();
    let execute = state.step(StepId::Execute).unwrap();
    assert_eq!(execute.status, StepStatus::Error);
    assert_eq!(
        execute.error.as_ref().unwrap().message,
        "Transaction timed out after 60s"
    );
    assert_eq!(state.aggregate_status, StepStatus::Error);

    // The user retries by hand; nothing retried on its own
    assert_eq!(h.executor.executions().len(), 1);
    h.executor.reject_with(None);
    h.flow.run(StepId::Execute).await.unwrap();
    assert_eq!(h.executor.executions().len(), 2);
}

#[tokio::test]
async fn test_payload_rejection_recorded() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");

    h.generator
        .reject_with(Some(TransactionError::new("Orderbook unavailable")));
    assert!(h.flow.refresh_payload().await.is_err());
    let state = h.flow.state();
    assert_eq!(state.payload_error.as_deref(), Some("Orderbook unavailable"));
    assert_eq!(
        state.step(StepId::Execute).unwrap().suggested_action,
        Some(SuggestedAction::WaitForTx)
    );

    h.generator.reject_with(None);
    assert!(h.flow.refresh_payload().await.unwrap());
    assert_eq!(h.flow.state().payload_error, None);
}

#[test]
fn test_payload_refresh_is_idempotent() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");

    assert!(tokio_test::block_on(h.flow.refresh_payload()).unwrap());
    assert!(tokio_test::block_on(h.flow.refresh_payload()).unwrap());
    assert_eq!(h.generator.requests().len(), 1);

    // New inputs make the stored payload stale
    h.flow.set_expiry_days(30);
    assert!(!h.flow.state().step(StepId::Execute).unwrap().guard().can_proceed);
    assert!(tokio_test::block_on(h.flow.refresh_payload()).unwrap());
    assert_eq!(h.generator.requests().len(), 2);
}

#[tokio::test]
async fn test_subscriber_sees_step_progress() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    let mut rx = h.flow.subscribe();

    h.flow.set_wallet(Some(Wallet::eoa(addr(WALLET))));
    h.flow.set_price("1");
    h.flow.refresh_payload().await.unwrap();
    h.flow.run(StepId::Execute).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.aggregate_status, StepStatus::Success);
}

#[test]
fn test_state_serializes_for_presentation() {
    let h = harness(FlowKind::Listing, MockGenerator::new());
    let json = serde_json::to_value(h.flow.state()).unwrap();

    assert_eq!(json["currentStep"], "form");
    assert_eq!(json["steps"][2]["label"], "Create listing");
    assert_eq!(json["steps"][2]["isDisabled"], true);
    assert_eq!(json["steps"][2]["suggestedAction"], "connect-wallet");
}
