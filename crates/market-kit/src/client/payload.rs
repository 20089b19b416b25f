//! Transaction payloads and the collaborators that build and submit them.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::TransactionError;
use crate::types::{Address, ContractType, FlowKind, OrderbookKind};

/// Role of a sub-step inside a generated payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubStepKind {
    /// Grants the marketplace contract access to the token or currency
    Approval,
    /// Creates the listing
    CreateListing,
    /// Creates the offer
    CreateOffer,
    /// Wraps or otherwise prepares funds before an offer
    PrepareFunds,
}

/// One on-chain call, ready to hand to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStep {
    pub kind: SubStepKind,
    pub to: Address,
    /// Calldata as 0x-prefixed hex
    pub data: String,
    /// Native value in wei, as decimal text
    #[serde(default)]
    pub value: Option<String>,
}

impl SubStep {
    /// Create a sub-step from raw calldata bytes.
    pub fn new(kind: SubStepKind, to: Address, data: &[u8]) -> Self {
        Self {
            kind,
            to,
            data: format!("0x{}", hex::encode(data)),
            value: None,
        }
    }

    /// Attach a native value in wei.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_approval(&self) -> bool {
        self.kind == SubStepKind::Approval
    }
}

/// Order parameters in smallest units, as the payload generator consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParams {
    pub token_id: String,
    /// Price per unit in the currency's smallest units
    pub price: String,
    /// Quantity in the collectible's smallest units
    pub quantity: String,
    /// Expiry as unix seconds
    pub expiry: i64,
    pub currency: Address,
}

/// Everything a payload generator needs to build order transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadRequest {
    pub chain_id: u64,
    pub collection: Address,
    pub contract_type: ContractType,
    pub orderbook: OrderbookKind,
    pub kind: FlowKind,
    pub wallet: Address,
    pub order: OrderParams,
}

/// A generated payload together with the request it answers.
///
/// A payload only counts as ready while its request still equals the request
/// the current inputs would produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPayload {
    pub request: PayloadRequest,
    pub steps: Vec<SubStep>,
}

impl TxPayload {
    pub fn new(request: PayloadRequest, steps: Vec<SubStep>) -> Self {
        Self { request, steps }
    }

    /// The approval sub-step, if the payload has one.
    pub fn approval(&self) -> Option<&SubStep> {
        self.steps.iter().find(|s| s.is_approval())
    }

    pub fn requires_approval(&self) -> bool {
        self.approval().is_some()
    }

    /// Every sub-step except the approval, in order.
    pub fn execution_steps(&self) -> Vec<SubStep> {
        self.steps
            .iter()
            .filter(|s| !s.is_approval())
            .cloned()
            .collect()
    }
}

/// Builds the ordered sub-steps for an order.
///
/// At most one returned sub-step may be of kind [`SubStepKind::Approval`].
pub trait PayloadGenerator: Send + Sync {
    fn generate(
        &self,
        request: PayloadRequest,
    ) -> BoxFuture<'_, Result<Vec<SubStep>, TransactionError>>;
}

/// Submits transactions through the connected wallet.
///
/// Each call resolves with the transaction hash once the wallet accepted the
/// transaction, or rejects. Timeouts are the implementation's concern and
/// surface as a rejection.
pub trait TransactionExecutor: Send + Sync {
    fn approve(&self, step: SubStep) -> BoxFuture<'_, Result<String, TransactionError>>;

    fn execute(&self, steps: Vec<SubStep>) -> BoxFuture<'_, Result<String, TransactionError>>;
}

impl<T: PayloadGenerator + ?Sized> PayloadGenerator for Arc<T> {
    fn generate(
        &self,
        request: PayloadRequest,
    ) -> BoxFuture<'_, Result<Vec<SubStep>, TransactionError>> {
        (**self).generate(request)
    }
}

impl<T: TransactionExecutor + ?Sized> TransactionExecutor for Arc<T> {
    fn approve(&self, step: SubStep) -> BoxFuture<'_, Result<String, TransactionError>> {
        (**self).approve(step)
    }

    fn execute(&self, steps: Vec<SubStep>) -> BoxFuture<'_, Result<String, TransactionError>> {
        (**self).execute(steps)
    }
}
