use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use wallet_core::transaction::Call;

pub const EVM_CALLS: &str = "evm-calls";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub accepted_payments: Vec<PaymentOption>,
    /// Seconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInteraction {
    #[serde(rename = "type")]
    pub interaction_type: String,
    pub data: Vec<Call>,
}

/// One way the requester is willing to be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    /// CAIP-19 asset id.
    pub asset: String,
    /// Hex quantity in the asset's smallest unit.
    pub amount: U256,
    /// CAIP-10 account, for direct transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_interaction: Option<ContractInteraction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentKind {
    Direct,
    Contract,
}

impl PaymentOption {
    /// `None` for options carrying both a recipient and a contract interaction, or neither.
    pub fn kind(&self) -> Option<PaymentKind> {
        match (&self.recipient, &self.contract_interaction) {
            (Some(_), None) => Some(PaymentKind::Direct),
            (None, Some(_)) => Some(PaymentKind::Contract),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    /// CAIP-2 chain id.
    pub chain_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedPaymentOption {
    #[serde(flatten)]
    pub option: PaymentOption,
    pub asset_metadata: AssetMetadata,
    pub chain_metadata: ChainMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasiblePayments {
    pub options: Vec<DetailedPaymentOption>,
}
