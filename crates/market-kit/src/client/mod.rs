//! Interfaces to the external collaborators a flow drives.
//!
//! The core does no network I/O of its own. Payload generation, transaction
//! submission and market data lookups are all supplied by the host through
//! these traits.

mod market_data;
mod payload;

pub use market_data::MarketData;
pub use payload::{
    OrderParams, PayloadGenerator, PayloadRequest, SubStep, SubStepKind, TransactionExecutor,
    TxPayload,
};
