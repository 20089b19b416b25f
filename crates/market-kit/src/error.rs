//! Error types for market-kit.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error) - Main error type, returned by the async flow operations
//!   - [`GuardViolation`] - A step was run while its guard was failing
//!   - [`TransactionError`] - An external executor or payload generator rejected
//!   - [`FetchError`] - A market data lookup failed
//!   - [`ParseAddressError`] - Invalid address format
//!   - [`ParseDecimalError`] - Invalid decimal text (strict parser only)
//!
//! Form validation problems are never errors. They are reported as
//! per-field messages on [`FormValidation`](crate::validation::FormValidation).
//!
//! # Example
//!
//! ```rust,no_run
//! use market_kit::{Error, Flow, StepId};
//!
//! # async fn example(flow: &Flow) {
//! match flow.run(StepId::Execute).await {
//!     Ok(outcome) => println!("Submitted: {:?}", outcome.tx_hash),
//!     Err(Error::GuardViolation(violation)) => {
//!         println!("Not ready: {}", violation.reason);
//!     }
//!     Err(Error::Transaction(err)) => println!("Rejected: {}", err),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! # }
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::flow::{StepId, SuggestedAction};
use crate::types::{Address, ContractType};

/// Error parsing an address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Address '{0}' must start with '0x'")]
    MissingPrefix(String),

    #[error("Address '{0}' must have 40 hex digits, got {1}")]
    InvalidLength(String, usize),

    #[error("Address '{0}' is not valid hex")]
    InvalidHex(String),
}

/// Error parsing decimal text with [`DecimalValue::try_parse`](crate::DecimalValue::try_parse).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseDecimalError {
    #[error("Decimal input is empty")]
    Empty,

    #[error("Invalid decimal format: '{0}'")]
    InvalidFormat(String),

    #[error("Too many decimal places: '{input}' allows at most {scale}")]
    TooManyDecimals { input: String, scale: u32 },

    #[error("Scale {0} exceeds the supported maximum")]
    ScaleTooLarge(u32),
}

/// A step was asked to run while its own guard was failing.
///
/// Produced only by the re-check inside [`Flow::run`](crate::Flow::run). It
/// signals that the UI offered an action the current state no longer allows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Step {step} cannot run: {reason}")]
pub struct GuardViolation {
    pub step: StepId,
    pub reason: String,
    pub suggested_action: Option<SuggestedAction>,
}

/// Rejection from an external transaction executor or payload generator.
///
/// Stored verbatim on the failed step. The user must re-trigger the step;
/// nothing in this crate retries.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct TransactionError {
    pub message: String,
    pub code: Option<i64>,
}

impl TransactionError {
    /// Create a transaction error with a message and no code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Create a transaction error carrying a provider or wallet error code.
    pub fn with_code(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Create the error used when the executor gave up waiting.
    pub fn timeout(after: impl std::fmt::Display) -> Self {
        Self::new(format!("Transaction timed out after {}", after))
    }
}

/// Opaque failure from a market data lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("Fetch failed: {0}")]
    Failed(String),
}

/// Main error type for market-kit operations.
#[derive(Debug, Error)]
pub enum Error {
    // ─── Step gating ───
    #[error(transparent)]
    GuardViolation(#[from] GuardViolation),

    #[error("Step {0} is not part of this flow")]
    UnknownStep(StepId),

    #[error("Fee option {0} does not exist")]
    UnknownFeeOption(usize),

    // ─── External collaborators ───
    #[error("Transaction failed: {0}")]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Collection {collection} is {actual:?}, expected {expected:?}")]
    ContractTypeMismatch {
        collection: Address,
        expected: ContractType,
        actual: ContractType,
    },

    // ─── Parsing ───
    #[error(transparent)]
    ParseAddress(#[from] ParseAddressError),

    #[error(transparent)]
    ParseDecimal(#[from] ParseDecimalError),

    // ─── Configuration ───
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error came from a step's own guard re-check.
    pub fn is_guard_violation(&self) -> bool {
        matches!(self, Error::GuardViolation(_))
    }

    /// Returns the suggested remedy when this is a guard violation.
    pub fn suggested_action(&self) -> Option<SuggestedAction> {
        match self {
            Error::GuardViolation(v) => v.suggested_action,
            _ => None,
        }
    }
}
