//! Marketplace domain records: currencies, wallets, collections and order venues.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Address;

// =============================================================================
// Currencies
// =============================================================================

/// A payment currency as returned by the currency fetcher.
///
/// Only `address` and `decimals` matter to the flow; `symbol` is for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Token contract address (the zero address for the native currency)
    pub address: Address,

    /// Token symbol (e.g., "USDC")
    pub symbol: String,

    /// Number of decimal places (e.g., 6 for USDC, 18 for WETH)
    pub decimals: u8,
}

impl Currency {
    /// Create a currency record.
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// The scale prices in this currency are parsed at.
    pub fn scale(&self) -> u32 {
        u32::from(self.decimals)
    }
}

// =============================================================================
// Collections and collectibles
// =============================================================================

/// Token standard of a collection contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContractType {
    Erc721,
    Erc1155,
}

/// Collection record as returned by the collection fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub address: Address,
    pub name: String,
    pub contract_type: ContractType,
}

/// Collectible (single token) record as returned by the collectible fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectibleInfo {
    pub token_id: String,
    pub name: Option<String>,

    /// Decimals of the token's supply. 0 for ERC-721 and most ERC-1155 tokens.
    #[serde(default)]
    pub decimals: u8,
}

/// Which order-matching venue a listing or offer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderbookKind {
    /// The marketplace's own on-chain orderbook
    Native,
    Opensea,
    LooksRare,
    Blur,
    MagicEden,
}

impl fmt::Display for OrderbookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderbookKind::Native => "native",
            OrderbookKind::Opensea => "opensea",
            OrderbookKind::LooksRare => "looks_rare",
            OrderbookKind::Blur => "blur",
            OrderbookKind::MagicEden => "magic_eden",
        };
        f.write_str(name)
    }
}

/// Whether the flow creates a listing (sell side) or an offer (buy side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Listing,
    Offer,
}

/// The collectible a flow operates on, fixed for the lifetime of the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTarget {
    pub chain_id: u64,
    pub collection: Address,
    pub token_id: String,
    pub contract_type: ContractType,
    pub orderbook: OrderbookKind,
}

impl FlowTarget {
    /// Create a target for a token in a collection.
    pub fn new(
        chain_id: u64,
        collection: Address,
        token_id: impl Into<String>,
        contract_type: ContractType,
        orderbook: OrderbookKind,
    ) -> Self {
        Self {
            chain_id,
            collection,
            token_id: token_id.into(),
            contract_type,
            orderbook,
        }
    }
}

// =============================================================================
// Wallets
// =============================================================================

/// Kind of connected wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    /// Externally owned account; always pays gas in the native currency
    Eoa,
    /// Smart wallet whose gas can be sponsored or paid in another token
    FeeAbstracted,
}

impl WalletKind {
    /// Whether transactions from this wallet need an explicit fee choice.
    pub fn supports_fee_sponsorship(&self) -> bool {
        matches!(self, WalletKind::FeeAbstracted)
    }
}

/// The connected wallet, as reported by the wallet connection layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub kind: WalletKind,
}

impl Wallet {
    /// A plain externally owned account.
    pub fn eoa(address: Address) -> Self {
        Self {
            address,
            kind: WalletKind::Eoa,
        }
    }

    /// A fee-abstracted smart wallet.
    pub fn fee_abstracted(address: Address) -> Self {
        Self {
            address,
            kind: WalletKind::FeeAbstracted,
        }
    }
}

/// A way to pay gas for a fee-abstracted wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOption {
    /// Currency the fee is paid in
    pub token: Currency,

    /// Fee amount in the token's smallest units
    pub amount: String,
}
