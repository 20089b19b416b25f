//! In-memory collaborators shared by the integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use market_kit::client::{
    MarketData, PayloadGenerator, PayloadRequest, SubStep, SubStepKind, TransactionExecutor,
};
use market_kit::*;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn addr(last: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last;
    Address::new(bytes)
}

pub const COLLECTION: u8 = 0x10;
pub const MARKETPLACE: u8 = 0x20;
pub const WALLET: u8 = 0xaa;

pub fn usdc() -> Currency {
    Currency::new(addr(0x01), "USDC", 6)
}

pub fn weth() -> Currency {
    Currency::new(addr(0x02), "WETH", 18)
}

pub fn target(contract_type: ContractType) -> FlowTarget {
    FlowTarget::new(
        1,
        addr(COLLECTION),
        "42",
        contract_type,
        OrderbookKind::Native,
    )
}

// =============================================================================
// Payload generator
// =============================================================================

/// Generates `[approval?, create]`, recording every request it sees.
#[derive(Clone, Default)]
pub struct MockGenerator {
    inner: Arc<GeneratorInner>,
}

#[derive(Default)]
struct GeneratorInner {
    /// Currencies whose payloads need an approval
    approval_for: Mutex<Vec<Address>>,
    reject_with: Mutex<Option<TransactionError>>,
    requests: Mutex<Vec<PayloadRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payloads priced in `currency` include an approval sub-step.
    pub fn with_approval_for(self, currency: Address) -> Self {
        self.inner.approval_for.lock().unwrap().push(currency);
        self
    }

    pub fn reject_with(&self, error: Option<TransactionError>) {
        *self.inner.reject_with.lock().unwrap() = error;
    }

    pub fn requests(&self) -> Vec<PayloadRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

impl PayloadGenerator for MockGenerator {
    fn generate(
        &self,
        request: PayloadRequest,
    ) -> BoxFuture<'_, Result<Vec<SubStep>, TransactionError>> {
        self.inner.requests.lock().unwrap().push(request.clone());
        let rejection = self.inner.reject_with.lock().unwrap().clone();
        let needs_approval = self
            .inner
            .approval_for
            .lock()
            .unwrap()
            .contains(&request.order.currency);

        Box::pin(async move {
            if let Some(err) = rejection {
                return Err(err);
            }
            let mut steps = Vec::new();
            if needs_approval {
                steps.push(SubStep::new(
                    SubStepKind::Approval,
                    request.order.currency,
                    request.order.price.as_bytes(),
                ));
            }
            let kind = match request.kind {
                FlowKind::Listing => SubStepKind::CreateListing,
                FlowKind::Offer => SubStepKind::CreateOffer,
            };
            steps.push(SubStep::new(kind, addr(MARKETPLACE), request.order.token_id.as_bytes()));
            Ok(steps)
        })
    }
}

// =============================================================================
// Transaction executor
// =============================================================================

/// Returns sequential hashes. Can be told to reject, or to hold every
/// submission until [`release`](Self::release) is called.
#[derive(Clone, Default)]
pub struct MockExecutor {
    inner: Arc<ExecutorInner>,
}

#[derive(Default)]
struct ExecutorInner {
    counter: AtomicUsize,
    reject_with: Mutex<Option<TransactionError>>,
    gate: Mutex<Option<Arc<Notify>>>,
    approvals: Mutex<Vec<SubStep>>,
    executions: Mutex<Vec<Vec<SubStep>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_with(&self, error: Option<TransactionError>) {
        *self.inner.reject_with.lock().unwrap() = error;
    }

    /// Hold submissions until released.
    pub fn gated(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.inner.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn approvals(&self) -> Vec<SubStep> {
        self.inner.approvals.lock().unwrap().clone()
    }

    pub fn executions(&self) -> Vec<Vec<SubStep>> {
        self.inner.executions.lock().unwrap().clone()
    }

    fn submit(&self) -> BoxFuture<'_, Result<String, TransactionError>> {
        let gate = self.inner.gate.lock().unwrap().clone();
        let rejection = self.inner.reject_with.lock().unwrap().clone();
        let n = self.inner.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match rejection {
                Some(err) => Err(err),
                None => Ok(format!("0x{:064x}", n)),
            }
        })
    }
}

impl TransactionExecutor for MockExecutor {
    fn approve(&self, step: SubStep) -> BoxFuture<'_, Result<String, TransactionError>> {
        self.inner.approvals.lock().unwrap().push(step);
        self.submit()
    }

    fn execute(&self, steps: Vec<SubStep>) -> BoxFuture<'_, Result<String, TransactionError>> {
        self.inner.executions.lock().unwrap().push(steps);
        self.submit()
    }
}

// =============================================================================
// Market data
// =============================================================================

/// Fixed market data keyed by address. Currency lookups can be held open
/// with [`gated`](Self::gated).
pub struct StaticMarketData {
    pub collectible_decimals: u8,
    pub contract_type: ContractType,
    pub currencies: HashMap<Address, Currency>,
    pub balances: HashMap<Address, DecimalValue>,
    gate: Option<Arc<Notify>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self {
            collectible_decimals: 0,
            contract_type: ContractType::Erc1155,
            currencies: HashMap::new(),
            balances: HashMap::new(),
            gate: None,
        }
    }

    pub fn with_contract_type(mut self, contract_type: ContractType) -> Self {
        self.contract_type = contract_type;
        self
    }

    /// Hold currency lookups until notified.
    pub fn gated(&mut self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gate = Some(notify.clone());
        notify
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currencies.insert(currency.address, currency);
        self
    }

    pub fn with_balance(mut self, token: Address, balance: DecimalValue) -> Self {
        self.balances.insert(token, balance);
        self
    }
}

impl MarketData for StaticMarketData {
    fn collectible(
        &self,
        _chain_id: u64,
        _collection: Address,
        token_id: String,
    ) -> BoxFuture<'_, Result<CollectibleInfo, FetchError>> {
        let info = CollectibleInfo {
            token_id,
            name: Some("Test token".to_string()),
            decimals: self.collectible_decimals,
        };
        Box::pin(async move { Ok(info) })
    }

    fn collection(
        &self,
        _chain_id: u64,
        collection: Address,
    ) -> BoxFuture<'_, Result<CollectionInfo, FetchError>> {
        let info = CollectionInfo {
            address: collection,
            name: "Test collection".to_string(),
            contract_type: self.contract_type,
        };
        Box::pin(async move { Ok(info) })
    }

    fn currency(
        &self,
        _chain_id: u64,
        address: Address,
    ) -> BoxFuture<'_, Result<Currency, FetchError>> {
        let result = self
            .currencies
            .get(&address)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                kind: "currency",
                key: address.to_string(),
            });
        let gate = self.gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            result
        })
    }

    fn balance(
        &self,
        _chain_id: u64,
        _owner: Address,
        token: Address,
        _token_id: Option<String>,
    ) -> BoxFuture<'_, Result<DecimalValue, FetchError>> {
        let result = self
            .balances
            .get(&token)
            .cloned()
            .ok_or_else(|| FetchError::Failed(format!("no balance for {}", token)));
        Box::pin(async move { result })
    }
}

// =============================================================================
// Flow helpers
// =============================================================================

pub struct Harness {
    pub flow: Flow,
    pub generator: MockGenerator,
    pub executor: MockExecutor,
}

pub fn harness(kind: FlowKind, generator: MockGenerator) -> Harness {
    init_tracing();
    let executor = MockExecutor::new();
    let flow = Flow::builder(kind, target(ContractType::Erc1155), usdc())
        .payload_generator(generator.clone())
        .executor(executor.clone())
        .build()
        .unwrap();
    Harness {
        flow,
        generator,
        executor,
    }
}
