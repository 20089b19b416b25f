//! Step orchestration for NFT marketplace listings and offers.
//!
//! **market-kit** turns raw order input (price, quantity, currency, expiry)
//! into a validated, ordered sequence of on-chain steps, decides whether each
//! step may run, and notices when a completed approval no longer covers the
//! order.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use market_kit::*;
//! # use market_kit::client::{PayloadGenerator, TransactionExecutor};
//!
//! # async fn example(
//! #     generator: impl PayloadGenerator + 'static,
//! #     executor: impl TransactionExecutor + 'static,
//! # ) -> Result<(), market_kit::Error> {
//! let collection: Address = "0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d".parse()?;
//! let usdc = Currency::new(
//!     "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse()?,
//!     "USDC",
//!     6,
//! );
//! let target = FlowTarget::new(1, collection, "42", ContractType::Erc721, OrderbookKind::Native);
//!
//! let flow = Flow::builder(FlowKind::Listing, target, usdc)
//!     .payload_generator(generator)
//!     .executor(executor)
//!     .build()?;
//!
//! flow.set_wallet(Some(Wallet::eoa("0x00000000000000000000000000000000000000aa".parse()?)));
//! flow.set_price("1.5");
//! assert_eq!(flow.price_in_smallest_unit(), "1500000");
//!
//! flow.refresh_payload().await?;
//! while let Some(step) = flow.state().next_step {
//!     flow.run(step).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Core Types
//!
//! - [`DecimalValue`] - Exact fixed-point amount at a token's scale
//! - [`Address`] - 20-byte contract or wallet address
//! - [`Flow`] - One listing or offer flow
//! - [`FlowState`] - Derived step list, current/next step and progress
//!
//! The pure building blocks are public too: [`validation::validate`],
//! [`flow::guard`], [`flow::invalidation`] and [`flow::recompute`].

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod types;
pub mod validation;

pub use config::{FlowConfig, StepLabels};
pub use error::{
    Error, FetchError, GuardViolation, ParseAddressError, ParseDecimalError, TransactionError,
};
pub use flow::{
    Flow, FlowBuilder, FlowState, GuardResult, StepDescriptor, StepId, StepOutcome, StepStatus,
    SuggestedAction,
};
pub use types::{
    Address, CollectibleInfo, CollectionInfo, ContractType, Currency, DecimalValue, FeeOption,
    FlowKind, FlowTarget, FormatOptions, OrderbookKind, Wallet, WalletKind,
};
