//! CAIP-2 chain ids, CAIP-10 account ids and CAIP-19 asset ids.

use std::{fmt, str::FromStr};

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const EIP155: &str = "eip155";
pub const ERC20: &str = "erc20";
pub const SLIP44: &str = "slip44";

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaipError {
    #[error("malformed {kind} identifier {value:?}: {reason}")]
    Malformed {
        kind: String,
        value: String,
        reason: String,
    },
}

fn malformed(kind: &str, value: &str, reason: impl Into<String>) -> CaipError {
    CaipError::Malformed {
        kind: kind.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn check_namespace(part: &str) -> bool {
    (3..=8).contains(&part.len())
        && part
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn check_chain_reference(part: &str) -> bool {
    (1..=32).contains(&part.len())
        && part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn check_account_address(part: &str) -> bool {
    (1..=128).contains(&part.len())
        && part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'%'))
}

fn check_asset_reference(part: &str) -> bool {
    check_account_address(part)
}

/// CAIP-2 `namespace:reference`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    pub namespace: String,
    pub reference: String,
}

impl ChainId {
    pub fn eip155(chain_id: u64) -> Self {
        Self {
            namespace: EIP155.to_string(),
            reference: chain_id.to_string(),
        }
    }

    /// Numeric chain id for `eip155` chains.
    pub fn eip155_id(&self) -> Option<u64> {
        (self.namespace == EIP155)
            .then(|| self.reference.parse().ok())
            .flatten()
    }
}

impl FromStr for ChainId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, reference) = s
            .split_once(':')
            .ok_or_else(|| malformed("CAIP-2", s, "expected namespace:reference"))?;
        if !check_namespace(namespace) {
            return Err(malformed("CAIP-2", s, "invalid namespace"));
        }
        if !check_chain_reference(reference) {
            return Err(malformed("CAIP-2", s, "invalid reference"));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        })
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

/// CAIP-10 `chain_id:address`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    pub chain_id: ChainId,
    pub address: String,
}

impl AccountId {
    pub fn evm_address(&self) -> Result<Address, CaipError> {
        self.address
            .parse()
            .map_err(|_| malformed("CAIP-10", &self.to_string(), "address is not an EVM address"))
    }
}

impl FromStr for AccountId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, address) = s
            .rsplit_once(':')
            .ok_or_else(|| malformed("CAIP-10", s, "expected chain_id:address"))?;
        let chain_id = chain.parse::<ChainId>().map_err(|_| malformed("CAIP-10", s, "invalid chain id"))?;
        if !check_account_address(address) {
            return Err(malformed("CAIP-10", s, "invalid address"));
        }
        Ok(Self {
            chain_id,
            address: address.to_string(),
        })
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.address)
    }
}

/// CAIP-19 `chain_id/asset_namespace:asset_reference`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId {
    pub chain_id: ChainId,
    pub asset_namespace: String,
    pub asset_reference: String,
}

impl FromStr for AssetId {
    type Err = CaipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, asset) = s
            .split_once('/')
            .ok_or_else(|| malformed("CAIP-19", s, "expected chain_id/asset_type"))?;
        let chain_id = chain.parse::<ChainId>().map_err(|_| malformed("CAIP-19", s, "invalid chain id"))?;
        let (asset_namespace, asset_reference) = asset
            .split_once(':')
            .ok_or_else(|| malformed("CAIP-19", s, "expected asset_namespace:asset_reference"))?;
        if !check_namespace(asset_namespace) {
            return Err(malformed("CAIP-19", s, "invalid asset namespace"));
        }
        if !check_asset_reference(asset_reference) {
            return Err(malformed("CAIP-19", s, "invalid asset reference"));
        }
        Ok(Self {
            chain_id,
            asset_namespace: asset_namespace.to_string(),
            asset_reference: asset_reference.to_string(),
        })
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}",
            self.chain_id, self.asset_namespace, self.asset_reference
        )
    }
}

macro_rules! string_serde {
    ($($ty:ty),*) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    )*};
}

string_serde!(ChainId, AccountId, AssetId);
