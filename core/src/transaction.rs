use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A single call executed by a smart account or simulated for an EOA.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Address,

    #[serde(default)]
    pub value: U256,

    #[serde(default)]
    pub data: Bytes,
}

impl Call {
    pub fn new(to: Address, value: U256, data: Bytes) -> Self {
        Self { to, value, data }
    }
}
