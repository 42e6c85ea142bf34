use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy::primitives::{Address, U256, address};
use wallet_core::error::WalletError;
use wallet_payments::{
    balance::ProtocolId,
    positions::{
        CacheConfig, Estimate, Market, PositionsService, YieldFallback, YieldFallbacks,
        YieldSource,
    },
};

const ACCOUNT: Address = address!("0xaAaAaAaaAaAaAaaAaAAAAAAAAaaaAaAaAaaAaaAa");
const USDC: Address = address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");

#[derive(Default, Clone)]
struct Counters {
    apy: Arc<AtomicUsize>,
    tvl: Arc<AtomicUsize>,
    balance: Arc<AtomicUsize>,
}

#[derive(Default)]
struct FakeYield {
    counters: Counters,
    apy_down: AtomicBool,
    balance_down: AtomicBool,
    deposited: AtomicUsize,
}

fn unavailable() -> WalletError {
    WalletError::InternalError {
        message: "upstream unavailable".to_string(),
    }
}

impl YieldSource for FakeYield {
    async fn apy(&self, _: &ProtocolId, _: u64, _: Address) -> Result<f64, WalletError> {
        self.counters.apy.fetch_add(1, Ordering::SeqCst);
        if self.apy_down.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(4.2)
    }

    async fn tvl(&self, _: &ProtocolId, _: u64, _: Address) -> Result<U256, WalletError> {
        self.counters.tvl.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(1_000_000))
    }

    async fn balance(
        &self,
        _: &ProtocolId,
        _: u64,
        _: Address,
        _: Address,
    ) -> Result<U256, WalletError> {
        self.counters.balance.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.balance_down.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(U256::from(self.deposited.load(Ordering::SeqCst)))
    }
}

fn market() -> Market {
    Market {
        protocol: ProtocolId::new("aave-v3"),
        chain_id: 8453,
        token: USDC,
    }
}

fn fallbacks() -> YieldFallbacks {
    YieldFallbacks {
        default: YieldFallback {
            apy: 0.0,
            tvl: U256::ZERO,
        },
        protocols: HashMap::from([(
            ProtocolId::new("aave-v3"),
            YieldFallback {
                apy: 3.5,
                tvl: U256::from(42),
            },
        )]),
    }
}

fn service(source: FakeYield) -> PositionsService<FakeYield> {
    PositionsService::new(source, vec![market()], fallbacks(), &CacheConfig::default())
}

#[tokio::test]
async fn concurrent_balance_reads_issue_one_fetch() {
    let source = FakeYield::default();
    source.deposited.store(7, Ordering::SeqCst);
    let counters = source.counters.clone();
    let service = service(source);

    let m = market();
    let (a, b) = tokio::join!(
        service.balance(&m, ACCOUNT),
        service.balance(&m, ACCOUNT),
    );

    assert_eq!(a, U256::from(7));
    assert_eq!(b, U256::from(7));
    assert_eq!(counters.balance.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn live_values_are_cached() {
    let source = FakeYield::default();
    let counters = source.counters.clone();
    let service = service(source);

    let first = service.get_positions(ACCOUNT).await;
    let second = service.get_positions(ACCOUNT).await;

    assert_eq!(first, second);
    assert_eq!(first[0].apy, Estimate::Live(4.2));
    assert_eq!(first[0].tvl, Estimate::Live(U256::from(1_000_000)));
    assert_eq!(counters.apy.load(Ordering::SeqCst), 1);
    assert_eq!(counters.tvl.load(Ordering::SeqCst), 1);
    assert_eq!(counters.balance.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn apy_failure_falls_back_to_configured_value() {
    let source = FakeYield::default();
    source.apy_down.store(true, Ordering::SeqCst);
    let service = service(source);

    let apy = service.apy(&market()).await;

    assert_eq!(apy, Estimate::Fallback(3.5));
    assert!(!apy.is_live());
    assert_eq!(*apy.value(), 3.5);
}

#[tokio::test]
async fn balance_failure_reports_zero() {
    let source = FakeYield::default();
    source.deposited.store(7, Ordering::SeqCst);
    source.balance_down.store(true, Ordering::SeqCst);
    let service = service(source);

    let position = service.get_position(&market(), ACCOUNT).await;

    assert_eq!(position.balance, U256::ZERO);
    assert!(position.apy.is_live());
}

#[tokio::test]
async fn transaction_invalidates_cached_balance() {
    let source = Arc::new(FakeYield::default());
    source.deposited.store(7, Ordering::SeqCst);
    let service = PositionsService::new(
        SharedYield(source.clone()),
        vec![market()],
        fallbacks(),
        &CacheConfig::default(),
    );

    assert_eq!(service.balance(&market(), ACCOUNT).await, U256::from(7));

    source.deposited.store(12, Ordering::SeqCst);
    assert_eq!(service.balance(&market(), ACCOUNT).await, U256::from(7));

    service.invalidate_after_transaction(&market(), ACCOUNT).await;
    assert_eq!(service.balance(&market(), ACCOUNT).await, U256::from(12));
    assert_eq!(source.counters.balance.load(Ordering::SeqCst), 2);
}

struct SharedYield(Arc<FakeYield>);

impl YieldSource for SharedYield {
    async fn apy(&self, protocol: &ProtocolId, chain_id: u64, token: Address) -> Result<f64, WalletError> {
        self.0.apy(protocol, chain_id, token).await
    }

    async fn tvl(&self, protocol: &ProtocolId, chain_id: u64, token: Address) -> Result<U256, WalletError> {
        self.0.tvl(protocol, chain_id, token).await
    }

    async fn balance(
        &self,
        protocol: &ProtocolId,
        chain_id: u64,
        token: Address,
        account: Address,
    ) -> Result<U256, WalletError> {
        self.0.balance(protocol, chain_id, token, account).await
    }
}
