use std::{future::Future, ops::Deref, sync::Arc, time::Duration};

use alloy::primitives::{Address, U256};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use wallet_core::error::WalletError;

/// Identifies the protocol a balance is held in, e.g. a wallet or a lending market.
#[derive(Hash, Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolId(pub String);

impl ProtocolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache key for a single balance. `token` is the zero address for the native asset.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct BalanceKey {
    pub protocol: ProtocolId,
    pub chain_id: u64,
    pub token: Address,
    pub account: Address,
}

/// Read-through balance cache. Concurrent lookups for one key share a single fetch.
#[derive(Clone)]
pub struct BalanceCache {
    pub inner: Cache<BalanceKey, U256>,
}

impl BalanceCache {
    pub fn new(cache: Cache<BalanceKey, U256>) -> Self {
        Self { inner: cache }
    }

    pub fn with_ttl(capacity: u64, ttl: Duration) -> Self {
        Self::new(
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        )
    }

    /// Return the cached balance or run `fetch`. A failed fetch is not cached.
    pub async fn get_or_fetch<F>(&self, key: BalanceKey, fetch: F) -> Result<U256, WalletError>
    where
        F: Future<Output = Result<U256, WalletError>>,
    {
        self.inner
            .try_get_with(key, fetch)
            .await
            .map_err(|e: Arc<WalletError>| e.deref().clone())
    }

    pub async fn invalidate(&self, key: &BalanceKey) {
        tracing::debug!(
            protocol = %key.protocol,
            chain_id = key.chain_id,
            token = %key.token,
            account = %key.account,
            "Invalidating cached balance"
        );
        self.inner.invalidate(key).await;
    }
}
