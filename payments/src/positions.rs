use std::{collections::HashMap, future::Future, ops::Deref, sync::Arc, time::Duration};

use alloy::primitives::{Address, U256};
use futures::future::join_all;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use wallet_core::error::WalletError;

use crate::balance::{BalanceCache, BalanceKey, ProtocolId};

/// A value read live or, when the read failed, the configured stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "camelCase")]
pub enum Estimate<T> {
    Live(T),
    Fallback(T),
}

impl<T> Estimate<T> {
    pub fn value(&self) -> &T {
        match self {
            Estimate::Live(value) | Estimate::Fallback(value) => value,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Estimate::Live(_))
    }
}

/// Reads yield data for the protocols a wallet can deposit into.
pub trait YieldSource: Send + Sync {
    fn apy(
        &self,
        protocol: &ProtocolId,
        chain_id: u64,
        token: Address,
    ) -> impl Future<Output = Result<f64, WalletError>> + Send;

    fn tvl(
        &self,
        protocol: &ProtocolId,
        chain_id: u64,
        token: Address,
    ) -> impl Future<Output = Result<U256, WalletError>> + Send;

    fn balance(
        &self,
        protocol: &ProtocolId,
        chain_id: u64,
        token: Address,
        account: Address,
    ) -> impl Future<Output = Result<U256, WalletError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldFallback {
    pub apy: f64,
    pub tvl: U256,
}

/// Static values reported when live APY or TVL reads fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldFallbacks {
    pub default: YieldFallback,
    #[serde(default)]
    pub protocols: HashMap<ProtocolId, YieldFallback>,
}

impl YieldFallbacks {
    pub fn for_protocol(&self, protocol: &ProtocolId) -> YieldFallback {
        self.protocols.get(protocol).copied().unwrap_or(self.default)
    }
}

fn default_balance_ttl() -> u64 {
    30
}

fn default_yield_ttl() -> u64 {
    120
}

fn default_capacity() -> u64 {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_balance_ttl")]
    pub balance_ttl_secs: u64,
    #[serde(default = "default_yield_ttl")]
    pub yield_ttl_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            balance_ttl_secs: default_balance_ttl(),
            yield_ttl_secs: default_yield_ttl(),
            capacity: default_capacity(),
        }
    }
}

/// A deposit target: one token in one protocol on one chain.
#[derive(Hash, Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub protocol: ProtocolId,
    pub chain_id: u64,
    pub token: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(flatten)]
    pub market: Market,
    pub apy: Estimate<f64>,
    pub tvl: Estimate<U256>,
    pub balance: U256,
}

pub struct PositionsService<S> {
    source: S,
    markets: Vec<Market>,
    fallbacks: YieldFallbacks,
    apy_cache: Cache<Market, f64>,
    tvl_cache: Cache<Market, U256>,
    balances: BalanceCache,
}

impl<S: YieldSource> PositionsService<S> {
    pub fn new(
        source: S,
        markets: Vec<Market>,
        fallbacks: YieldFallbacks,
        config: &CacheConfig,
    ) -> Self {
        let yield_ttl = Duration::from_secs(config.yield_ttl_secs);
        Self {
            source,
            markets,
            fallbacks,
            apy_cache: Cache::builder()
                .max_capacity(config.capacity)
                .time_to_live(yield_ttl)
                .build(),
            tvl_cache: Cache::builder()
                .max_capacity(config.capacity)
                .time_to_live(yield_ttl)
                .build(),
            balances: BalanceCache::with_ttl(
                config.capacity,
                Duration::from_secs(config.balance_ttl_secs),
            ),
        }
    }

    pub async fn get_positions(&self, account: Address) -> Vec<Position> {
        join_all(
            self.markets
                .iter()
                .map(|market| self.get_position(market, account)),
        )
        .await
    }

    pub async fn get_position(&self, market: &Market, account: Address) -> Position {
        let (apy, tvl, balance) = futures::join!(
            self.apy(market),
            self.tvl(market),
            self.balance(market, account),
        );
        Position {
            market: market.clone(),
            apy,
            tvl,
            balance,
        }
    }

    pub async fn apy(&self, market: &Market) -> Estimate<f64> {
        let live = self
            .apy_cache
            .try_get_with(
                market.clone(),
                self.source
                    .apy(&market.protocol, market.chain_id, market.token),
            )
            .await
            .map_err(|e: Arc<WalletError>| e.deref().clone());

        match live {
            Ok(apy) => Estimate::Live(apy),
            Err(e) => {
                let fallback = self.fallbacks.for_protocol(&market.protocol).apy;
                tracing::warn!(
                    protocol = %market.protocol,
                    chain_id = market.chain_id,
                    error = %e,
                    fallback,
                    "APY read failed, using fallback"
                );
                Estimate::Fallback(fallback)
            }
        }
    }

    pub async fn tvl(&self, market: &Market) -> Estimate<U256> {
        let live = self
            .tvl_cache
            .try_get_with(
                market.clone(),
                self.source
                    .tvl(&market.protocol, market.chain_id, market.token),
            )
            .await
            .map_err(|e: Arc<WalletError>| e.deref().clone());

        match live {
            Ok(tvl) => Estimate::Live(tvl),
            Err(e) => {
                let fallback = self.fallbacks.for_protocol(&market.protocol).tvl;
                tracing::warn!(
                    protocol = %market.protocol,
                    chain_id = market.chain_id,
                    error = %e,
                    fallback = %fallback,
                    "TVL read failed, using fallback"
                );
                Estimate::Fallback(fallback)
            }
        }
    }

    /// Deposited balance, reported as zero when it cannot be read.
    pub async fn balance(&self, market: &Market, account: Address) -> U256 {
        let key = balance_key(market, account);
        let fetch = self
            .source
            .balance(&market.protocol, market.chain_id, market.token, account);

        match self.balances.get_or_fetch(key, fetch).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(
                    protocol = %market.protocol,
                    chain_id = market.chain_id,
                    account = %account,
                    error = %e,
                    "Balance read failed, reporting zero"
                );
                U256::ZERO
            }
        }
    }

    /// Drop everything a deposit or withdrawal in `market` by `account` may have changed.
    pub async fn invalidate_after_transaction(&self, market: &Market, account: Address) {
        self.balances
            .invalidate(&balance_key(market, account))
            .await;
        self.tvl_cache.invalidate(market).await;
        self.apy_cache.invalidate(market).await;
    }
}

fn balance_key(market: &Market, account: Address) -> BalanceKey {
    BalanceKey {
        protocol: market.protocol.clone(),
        chain_id: market.chain_id,
        token: market.token,
        account,
    }
}
