//! Market data lookups supplied by the host.

use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::types::{Address, CollectibleInfo, CollectionInfo, Currency, DecimalValue};

/// Fetchers for collectibles, collections, currencies and balances.
///
/// Implementations do their own caching and network I/O; the flow only awaits
/// the results and never retries.
pub trait MarketData: Send + Sync {
    fn collectible(
        &self,
        chain_id: u64,
        collection: Address,
        token_id: String,
    ) -> BoxFuture<'_, Result<CollectibleInfo, FetchError>>;

    fn collection(
        &self,
        chain_id: u64,
        collection: Address,
    ) -> BoxFuture<'_, Result<CollectionInfo, FetchError>>;

    fn currency(
        &self,
        chain_id: u64,
        address: Address,
    ) -> BoxFuture<'_, Result<Currency, FetchError>>;

    /// Balance of `owner`.
    ///
    /// With `token_id` set this is the collectible balance, otherwise the
    /// balance of the currency at `token`. The value is at the token's scale.
    fn balance(
        &self,
        chain_id: u64,
        owner: Address,
        token: Address,
        token_id: Option<String>,
    ) -> BoxFuture<'_, Result<DecimalValue, FetchError>>;
}
