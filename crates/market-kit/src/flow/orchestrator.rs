//! The stateful flow a host drives.
//!
//! [`Flow`] owns the order inputs and the execution state of its on-chain
//! steps. Every read goes through [`recompute`], so the step list is never
//! stored and never goes stale. The inner lock is never held across an
//! await; the host can keep calling [`Flow::state`] and the setters while a
//! step is pending.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{
    MarketData, OrderParams, PayloadGenerator, PayloadRequest, SubStep, TransactionExecutor,
    TxPayload,
};
use crate::config::FlowConfig;
use crate::error::{Error, GuardViolation, TransactionError};
use crate::types::{Currency, DecimalValue, FeeOption, FlowKind, FlowTarget, Wallet};
use crate::validation::{FormValidation, ValidationInputs, validate};

use super::form::OrderForm;
use super::invalidation::{ApprovalDependencySnapshot, ApprovalTracker};
use super::state::{FlowSnapshot, FlowState, recompute};
use super::step::{ExecutionState, StepId};

/// Result of a successful [`Flow::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: StepId,
    /// Set for the approve and execute steps
    pub tx_hash: Option<String>,
}

impl StepOutcome {
    fn local(step: StepId) -> Self {
        Self {
            step,
            tx_hash: None,
        }
    }
}

struct FlowInner {
    form: OrderForm,
    wallet: Option<Wallet>,
    balance: Option<DecimalValue>,
    reference_price: Option<DecimalValue>,
    fee_options: Vec<FeeOption>,
    selected_fee: Option<usize>,
    fee_confirmed: bool,
    fee_sponsored: bool,
    payload: Option<TxPayload>,
    payload_error: Option<String>,
    approval: ExecutionState,
    approved_in_session: bool,
    tracker: ApprovalTracker,
    execute: ExecutionState,
}

impl FlowInner {
    fn validation(&self, kind: FlowKind) -> FormValidation {
        let price = self.form.price();
        let quantity = self.form.quantity();
        let mut inputs = ValidationInputs::new(kind, &price, &quantity);
        if let Some(balance) = &self.balance {
            inputs = inputs.balance(balance);
        }
        if let (FlowKind::Offer, Some(reference)) = (kind, &self.reference_price) {
            inputs = inputs.reference_price(reference);
        }
        validate(&inputs)
    }

    /// The request the current inputs produce. None without a wallet.
    fn request(&self, kind: FlowKind, target: &FlowTarget) -> Option<PayloadRequest> {
        let wallet = self.wallet.as_ref()?;
        Some(PayloadRequest {
            chain_id: target.chain_id,
            collection: target.collection,
            contract_type: target.contract_type,
            orderbook: target.orderbook,
            kind,
            wallet: wallet.address,
            order: self.form.order_params(&target.token_id),
        })
    }

    /// The stored payload, but only if it answers the current request.
    fn fresh_payload(&self, kind: FlowKind, target: &FlowTarget) -> Option<&TxPayload> {
        let request = self.request(kind, target)?;
        self.payload.as_ref().filter(|p| p.request == request)
    }

    fn dependencies(&self, target: &FlowTarget) -> ApprovalDependencySnapshot {
        ApprovalDependencySnapshot::new(self.form.currency().address, target.collection)
    }

    fn snapshot(&self, kind: FlowKind, target: &FlowTarget, config: &FlowConfig) -> FlowSnapshot {
        let payload_requires_approval = self
            .payload
            .as_ref()
            .is_some_and(TxPayload::requires_approval);
        let invalidation_reason = self.tracker.reason().map(str::to_string);

        FlowSnapshot {
            kind,
            labels: config.labels.clone(),
            validation: self.validation(kind),
            wallet_connected: self.wallet.is_some(),
            wallet_supports_fee_sponsorship: self
                .wallet
                .as_ref()
                .is_some_and(|w| w.kind.supports_fee_sponsorship()),
            fee_resolved: self.fee_sponsored || self.fee_confirmed,
            fee_selected: self.selected_fee.is_some(),
            tx_payload_ready: self.fresh_payload(kind, target).is_some(),
            payload_requires_approval,
            approval: self.approval.clone(),
            approved_in_session: self.approved_in_session,
            approval_invalidated: invalidation_reason.is_some() && payload_requires_approval,
            invalidation_reason,
            execute: self.execute.clone(),
            payload_error: self.payload_error.clone(),
        }
    }
}

/// A single listing or offer flow.
///
/// # Example
///
/// ```rust,no_run
/// use market_kit::{Flow, FlowKind, StepId};
/// # use market_kit::{FlowTarget, Currency, Wallet};
/// # use market_kit::client::{PayloadGenerator, TransactionExecutor};
///
/// # async fn example(
/// #     target: FlowTarget,
/// #     usdc: Currency,
/// #     wallet: Wallet,
/// #     generator: impl PayloadGenerator + 'static,
/// #     executor: impl TransactionExecutor + 'static,
/// # ) -> Result<(), market_kit::Error> {
/// let flow = Flow::builder(FlowKind::Listing, target, usdc)
///     .payload_generator(generator)
///     .executor(executor)
///     .build()?;
///
/// flow.set_wallet(Some(wallet));
/// flow.set_price("1.5");
/// flow.refresh_payload().await?;
///
/// while let Some(step) = flow.state().next_step {
///     flow.run(step).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Flow {
    kind: FlowKind,
    target: FlowTarget,
    config: FlowConfig,
    generator: Arc<dyn PayloadGenerator>,
    executor: Arc<dyn TransactionExecutor>,
    inner: Mutex<FlowInner>,
    state_tx: watch::Sender<FlowState>,
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .finish()
    }
}

impl Flow {
    /// Start building a flow for `target`, priced in `currency`.
    pub fn builder(kind: FlowKind, target: FlowTarget, currency: Currency) -> FlowBuilder {
        FlowBuilder::new(kind, target, currency)
    }

    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    pub fn target(&self) -> &FlowTarget {
        &self.target
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Recompute the flow state from the current inputs.
    pub fn state(&self) -> FlowState {
        let mut inner = self.lock();
        self.refresh(&mut inner)
    }

    /// Receive a new [`FlowState`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state_tx.subscribe()
    }

    pub fn validation(&self) -> FormValidation {
        self.lock().validation(self.kind)
    }

    /// The stored payload, fresh or not.
    pub fn payload(&self) -> Option<TxPayload> {
        self.lock().payload.clone()
    }

    pub fn currency(&self) -> Currency {
        self.lock().form.currency().clone()
    }

    pub fn wallet(&self) -> Option<Wallet> {
        self.lock().wallet.clone()
    }

    pub fn selected_fee(&self) -> Option<FeeOption> {
        let inner = self.lock();
        inner
            .selected_fee
            .and_then(|index| inner.fee_options.get(index).cloned())
    }

    // ========================================================================
    // Form inputs
    // ========================================================================

    pub fn set_price(&self, text: impl Into<String>) {
        self.update(|inner| inner.form.set_price(text));
    }

    pub fn set_quantity(&self, text: impl Into<String>) {
        self.update(|inner| inner.form.set_quantity(text));
    }

    /// Switch the payment currency. Invalidates a completed approval that was
    /// granted for the previous currency.
    ///
    /// An offer's balance is held in the payment currency, so a different
    /// currency drops it until the host syncs again.
    pub fn set_currency(&self, currency: Currency) {
        let kind = self.kind;
        self.update(|inner| {
            if kind == FlowKind::Offer && inner.form.currency().address != currency.address {
                inner.balance = None;
            }
            inner.form.set_currency(currency);
        });
    }

    /// Set the expiry, clamped to `1..=max_expiry_days`.
    pub fn set_expiry_days(&self, days: u32) {
        let days = self.config.clamp_expiry_days(days);
        self.update(|inner| inner.form.set_expiry_days(days));
    }

    pub fn price(&self) -> DecimalValue {
        self.lock().form.price()
    }

    pub fn quantity(&self) -> DecimalValue {
        self.lock().form.quantity()
    }

    pub fn price_in_smallest_unit(&self) -> String {
        self.lock().form.price_in_smallest_unit()
    }

    pub fn quantity_in_smallest_unit(&self) -> String {
        self.lock().form.quantity_in_smallest_unit()
    }

    pub fn order_params(&self) -> OrderParams {
        self.lock().form.order_params(&self.target.token_id)
    }

    // ========================================================================
    // External data
    // ========================================================================

    /// Connect, switch or disconnect the wallet.
    ///
    /// A different wallet drops the known balance and any fee decision.
    pub fn set_wallet(&self, wallet: Option<Wallet>) {
        self.update(|inner| {
            if inner.wallet != wallet {
                inner.balance = None;
                inner.selected_fee = None;
                inner.fee_confirmed = false;
                inner.fee_sponsored = false;
            }
            inner.wallet = wallet;
        });
    }

    /// Collectible balance for listings, currency balance for offers.
    pub fn set_balance(&self, balance: Option<DecimalValue>) {
        self.update(|inner| inner.balance = balance);
    }

    /// Price an offer must exceed. Ignored by listings.
    pub fn set_reference_price(&self, price: Option<DecimalValue>) {
        self.update(|inner| inner.reference_price = price);
    }

    pub fn set_fee_options(&self, options: Vec<FeeOption>) {
        self.update(|inner| {
            if inner.selected_fee.is_some_and(|index| index >= options.len()) {
                inner.selected_fee = None;
            }
            inner.fee_options = options;
        });
    }

    pub fn select_fee(&self, index: usize) -> Result<(), Error> {
        let mut inner = self.lock();
        if index >= inner.fee_options.len() {
            return Err(Error::UnknownFeeOption(index));
        }
        inner.selected_fee = Some(index);
        self.refresh(&mut inner);
        Ok(())
    }

    /// Mark the fee as sponsored, which removes the fee selection step.
    pub fn set_fee_sponsored(&self, sponsored: bool) {
        self.update(|inner| inner.fee_sponsored = sponsored);
    }

    /// Fetch the collection, the collectible's decimals, the currency record
    /// and the relevant balance, then apply them.
    ///
    /// Fails with [`Error::ContractTypeMismatch`] when the collection is not
    /// of the flow's contract type. Results that no longer match the inputs
    /// once the lookups finish are dropped: a currency record and offer
    /// balance when the user switched currency meanwhile, a balance when the
    /// wallet changed.
    pub async fn sync_market_data(&self, data: &dyn MarketData) -> Result<(), Error> {
        let (currency, owner) = {
            let inner = self.lock();
            (
                inner.form.currency().address,
                inner.wallet.as_ref().map(|w| w.address),
            )
        };
        let chain_id = self.target.chain_id;

        let collection = data
            .collection(chain_id, self.target.collection)
            .await
            .inspect_err(|e| warn!(error = %e, "Collection lookup failed"))?;
        if collection.contract_type != self.target.contract_type {
            warn!(
                collection = %self.target.collection,
                expected = ?self.target.contract_type,
                actual = ?collection.contract_type,
                "Collection contract type mismatch"
            );
            return Err(Error::ContractTypeMismatch {
                collection: self.target.collection,
                expected: self.target.contract_type,
                actual: collection.contract_type,
            });
        }

        let collectible = data
            .collectible(chain_id, self.target.collection, self.target.token_id.clone())
            .await
            .inspect_err(|e| warn!(error = %e, "Collectible lookup failed"))?;
        let fetched = data
            .currency(chain_id, currency)
            .await
            .inspect_err(|e| warn!(error = %e, "Currency lookup failed"))?;

        let balance = match owner {
            Some(owner) => {
                let (token, token_id) = match self.kind {
                    FlowKind::Listing => {
                        (self.target.collection, Some(self.target.token_id.clone()))
                    }
                    FlowKind::Offer => (fetched.address, None),
                };
                let balance = data
                    .balance(chain_id, owner, token, token_id)
                    .await
                    .inspect_err(|e| warn!(error = %e, "Balance lookup failed"))?;
                Some(balance)
            }
            None => None,
        };

        debug!(
            decimals = collectible.decimals,
            currency = %fetched.symbol,
            balance = ?balance.as_ref().map(ToString::to_string),
            "Market data synced"
        );

        let kind = self.kind;
        self.update(|inner| {
            inner.form.set_collectible_decimals(collectible.decimals);

            let same_currency = inner.form.currency().address == currency;
            let same_owner = inner.wallet.as_ref().map(|w| w.address) == owner;
            if same_currency {
                inner.form.set_currency(fetched);
            } else {
                debug!(
                    requested = %currency,
                    current = %inner.form.currency().address,
                    "Currency changed during sync, dropping currency record"
                );
            }
            let balance_current = match kind {
                FlowKind::Listing => same_owner,
                FlowKind::Offer => same_owner && same_currency,
            };
            if balance_current {
                inner.balance = balance;
            }
        });
        Ok(())
    }

    /// Request a payload for the current inputs.
    ///
    /// Returns `Ok(true)` when a payload for exactly the current inputs is
    /// ready afterwards, `Ok(false)` when the inputs cannot produce one yet
    /// (no wallet or an invalid form) or changed while the request was in
    /// flight. A rejection is recorded as the flow's payload error and
    /// returned.
    pub async fn refresh_payload(&self) -> Result<bool, Error> {
        let request = {
            let inner = self.lock();
            if inner.fresh_payload(self.kind, &self.target).is_some() {
                return Ok(true);
            }
            if !inner.validation(self.kind).is_valid() {
                return Ok(false);
            }
            match inner.request(self.kind, &self.target) {
                Some(request) => request,
                None => return Ok(false),
            }
        };

        debug!(
            price = %request.order.price,
            quantity = %request.order.quantity,
            currency = %request.order.currency,
            "Requesting payload"
        );

        let result = self
            .generator
            .generate(request.clone())
            .await
            .and_then(|steps| {
                let approvals = steps.iter().filter(|s| s.is_approval()).count();
                if approvals > 1 {
                    return Err(TransactionError::new(format!(
                        "Payload contains {} approval steps, expected at most one",
                        approvals
                    )));
                }
                Ok(steps)
            });

        let mut inner = self.lock();
        match result {
            Ok(steps) => {
                debug!(sub_steps = steps.len(), "Payload ready");
                inner.payload = Some(TxPayload::new(request, steps));
                inner.payload_error = None;
                let ready = inner.fresh_payload(self.kind, &self.target).is_some();
                self.refresh(&mut inner);
                Ok(ready)
            }
            Err(e) => {
                warn!(error = %e, "Payload generation failed");
                inner.payload_error = Some(e.message.clone());
                self.refresh(&mut inner);
                Err(e.into())
            }
        }
    }

    // ========================================================================
    // Running steps
    // ========================================================================

    /// Run a step.
    ///
    /// The step's descriptor is re-evaluated against the live state first; a
    /// disabled step fails with [`Error::GuardViolation`] before anything is
    /// submitted. On-chain steps are marked pending while the executor runs
    /// and end as success or error. A rejection is kept on the step and also
    /// returned. Nothing is retried.
    pub async fn run(&self, step: StepId) -> Result<StepOutcome, Error> {
        let submission = {
            let mut inner = self.lock();
            let state = self.refresh(&mut inner);
            let descriptor = state.step(step).ok_or(Error::UnknownStep(step))?;
            if descriptor.is_disabled {
                return Err(GuardViolation {
                    step,
                    reason: descriptor.disabled_reason.clone().unwrap_or_default(),
                    suggested_action: descriptor.suggested_action,
                }
                .into());
            }

            let submission = match step {
                StepId::Form => return Ok(StepOutcome::local(step)),
                StepId::FeeSelection => {
                    inner.fee_confirmed = true;
                    info!(step = %step, "Fee option confirmed");
                    self.refresh(&mut inner);
                    return Ok(StepOutcome::local(step));
                }
                StepId::Approve => {
                    let approval = inner
                        .fresh_payload(self.kind, &self.target)
                        .and_then(TxPayload::approval)
                        .cloned();
                    let Some(approval) = approval else {
                        return Err(GuardViolation {
                            step,
                            reason: "This order needs no approval".to_string(),
                            suggested_action: None,
                        }
                        .into());
                    };
                    let dependencies = inner.dependencies(&self.target);
                    inner.approval.start();
                    Submission::Approve(approval, dependencies)
                }
                StepId::Execute => {
                    let steps = inner
                        .fresh_payload(self.kind, &self.target)
                        .map(TxPayload::execution_steps)
                        .unwrap_or_default();
                    inner.execute.start();
                    Submission::Execute(steps)
                }
            };
            self.refresh(&mut inner);
            submission
        };
        info!(step = %step, "Step started");

        match submission {
            Submission::Approve(approval, dependencies) => {
                let result = self.executor.approve(approval).await;
                let mut inner = self.lock();
                match result {
                    Ok(hash) => {
                        inner.approval.succeed(Some(hash.clone()));
                        inner.approved_in_session = true;
                        inner.tracker.record_approval(dependencies);
                        info!(step = %step, tx_hash = %hash, "Step succeeded");
                        self.refresh(&mut inner);
                        Ok(StepOutcome {
                            step,
                            tx_hash: Some(hash),
                        })
                    }
                    Err(e) => {
                        inner.approval.fail(e.clone());
                        warn!(step = %step, error = %e, code = ?e.code, "Step failed");
                        self.refresh(&mut inner);
                        Err(e.into())
                    }
                }
            }
            Submission::Execute(steps) => {
                let result = self.executor.execute(steps).await;
                let mut inner = self.lock();
                match result {
                    Ok(hash) => {
                        inner.execute.succeed(Some(hash.clone()));
                        info!(step = %step, tx_hash = %hash, "Step succeeded");
                        self.refresh(&mut inner);
                        Ok(StepOutcome {
                            step,
                            tx_hash: Some(hash),
                        })
                    }
                    Err(e) => {
                        inner.execute.fail(e.clone());
                        warn!(step = %step, error = %e, code = ?e.code, "Step failed");
                        self.refresh(&mut inner);
                        Err(e.into())
                    }
                }
            }
        }
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn lock(&self) -> MutexGuard<'_, FlowInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut FlowInner)) {
        let mut inner = self.lock();
        f(&mut *inner);
        self.refresh(&mut inner);
    }

    /// Apply invalidation, recompute and publish.
    fn refresh(&self, inner: &mut FlowInner) -> FlowState {
        let dependencies = inner.dependencies(&self.target);
        inner.tracker.observe(dependencies, &mut inner.approval);

        let state = recompute(&inner.snapshot(self.kind, &self.target, &self.config));
        debug!(
            steps = ?state.step_ids(),
            current_step = ?state.current_step,
            next_step = ?state.next_step,
            progress = state.progress_percent,
            "Flow recomputed"
        );
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state.clone();
            true
        });
        state
    }
}

enum Submission {
    Approve(SubStep, ApprovalDependencySnapshot),
    Execute(Vec<SubStep>),
}

// ============================================================================
// FlowBuilder
// ============================================================================

/// Builder for [`Flow`].
pub struct FlowBuilder {
    kind: FlowKind,
    target: FlowTarget,
    currency: Currency,
    generator: Option<Arc<dyn PayloadGenerator>>,
    executor: Option<Arc<dyn TransactionExecutor>>,
    collectible_decimals: u8,
    expiry_days: Option<u32>,
    config: FlowConfig,
}

impl FlowBuilder {
    fn new(kind: FlowKind, target: FlowTarget, currency: Currency) -> Self {
        Self {
            kind,
            target,
            currency,
            generator: None,
            executor: None,
            collectible_decimals: 0,
            expiry_days: None,
            config: FlowConfig::default(),
        }
    }

    /// Set the payload generator.
    pub fn payload_generator(mut self, generator: impl PayloadGenerator + 'static) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Set the transaction executor.
    pub fn executor(mut self, executor: impl TransactionExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Decimals of the collectible's supply (default: 0).
    pub fn collectible_decimals(mut self, decimals: u8) -> Self {
        self.collectible_decimals = decimals;
        self
    }

    /// Initial expiry (default: `config.default_expiry_days`).
    pub fn expiry_days(mut self, days: u32) -> Self {
        self.expiry_days = Some(days);
        self
    }

    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the flow.
    pub fn build(self) -> Result<Flow, Error> {
        self.config.validate()?;
        let generator = self
            .generator
            .ok_or_else(|| Error::Config("a payload generator is required".to_string()))?;
        let executor = self
            .executor
            .ok_or_else(|| Error::Config("a transaction executor is required".to_string()))?;

        let expiry_days = self
            .config
            .clamp_expiry_days(self.expiry_days.unwrap_or(self.config.default_expiry_days));
        let form = OrderForm::new(
            self.currency,
            self.collectible_decimals,
            self.config.default_quantity.clone(),
            expiry_days,
        );
        let inner = FlowInner {
            form,
            wallet: None,
            balance: None,
            reference_price: None,
            fee_options: Vec::new(),
            selected_fee: None,
            fee_confirmed: false,
            fee_sponsored: false,
            payload: None,
            payload_error: None,
            approval: ExecutionState::default(),
            approved_in_session: false,
            tracker: ApprovalTracker::new(),
            execute: ExecutionState::default(),
        };

        let initial = recompute(&inner.snapshot(self.kind, &self.target, &self.config));
        let (state_tx, _) = watch::channel(initial);

        Ok(Flow {
            kind: self.kind,
            target: self.target,
            config: self.config,
            generator,
            executor,
            inner: Mutex::new(inner),
            state_tx,
        })
    }
}
