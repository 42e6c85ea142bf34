use std::collections::HashMap;

use crate::{
    caip::{AssetId, ChainId, ERC20, SLIP44},
    checkout::{AssetMetadata, ChainMetadata},
};

/// Display metadata for assets and chains.
pub trait AssetRegistry: Send + Sync {
    fn asset_metadata(&self, asset: &AssetId) -> Option<AssetMetadata>;
    fn chain_metadata(&self, chain: &ChainId) -> Option<ChainMetadata>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticAssetRegistry {
    assets: HashMap<String, AssetMetadata>,
    chains: HashMap<String, ChainMetadata>,
}

// EVM asset references are hex addresses; compare them case-insensitively.
fn asset_key(asset: &AssetId) -> String {
    asset.to_string().to_lowercase()
}

fn token(name: &str, symbol: &str, decimals: u8) -> AssetMetadata {
    AssetMetadata {
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals,
        icon_url: None,
    }
}

impl StaticAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, asset: &AssetId, metadata: AssetMetadata) -> Self {
        self.assets.insert(asset_key(asset), metadata);
        self
    }

    pub fn with_chain(mut self, name: &str, chain: ChainId) -> Self {
        self.chains.insert(
            chain.to_string(),
            ChainMetadata {
                chain_id: chain.to_string(),
                name: name.to_string(),
                icon_url: None,
            },
        );
        self
    }

    /// Mainnet, Optimism, Base and Arbitrum with their native ETH and USDC.
    pub fn with_defaults() -> Self {
        const USDC: [(u64, &str); 4] = [
            (1, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            (10, "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85"),
            (8453, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            (42161, "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
        ];

        let mut registry = Self::new()
            .with_chain("Ethereum", ChainId::eip155(1))
            .with_chain("OP Mainnet", ChainId::eip155(10))
            .with_chain("Base", ChainId::eip155(8453))
            .with_chain("Arbitrum One", ChainId::eip155(42161));

        for (chain_id, usdc) in USDC {
            let native = AssetId {
                chain_id: ChainId::eip155(chain_id),
                asset_namespace: SLIP44.to_string(),
                asset_reference: "60".to_string(),
            };
            let usdc = AssetId {
                chain_id: ChainId::eip155(chain_id),
                asset_namespace: ERC20.to_string(),
                asset_reference: usdc.to_string(),
            };
            registry = registry
                .with_asset(&native, token("Ether", "ETH", 18))
                .with_asset(&usdc, token("USD Coin", "USDC", 6));
        }
        registry
    }
}

impl AssetRegistry for StaticAssetRegistry {
    fn asset_metadata(&self, asset: &AssetId) -> Option<AssetMetadata> {
        self.assets.get(&asset_key(asset)).cloned()
    }

    fn chain_metadata(&self, chain: &ChainId) -> Option<ChainMetadata> {
        self.chains.get(&chain.to_string()).cloned()
    }
}

/// Metadata reported for assets the registry does not know.
pub fn unresolved_asset(asset: &AssetId) -> AssetMetadata {
    AssetMetadata {
        name: asset.asset_reference.clone(),
        symbol: "UNKNOWN".to_string(),
        decimals: if asset.asset_namespace == SLIP44 { 18 } else { 0 },
        icon_url: None,
    }
}

pub fn unresolved_chain(chain: &ChainId) -> ChainMetadata {
    ChainMetadata {
        chain_id: chain.to_string(),
        name: chain.to_string(),
        icon_url: None,
    }
}
