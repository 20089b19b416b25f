//! Core value types for marketplace flows.

mod address;
mod decimal;
mod market;

pub use address::Address;
pub use decimal::{DecimalValue, FormatOptions, MAX_SCALE};
pub use market::{
    CollectibleInfo, CollectionInfo, ContractType, Currency, FeeOption, FlowKind, FlowTarget,
    OrderbookKind, Wallet, WalletKind,
};
