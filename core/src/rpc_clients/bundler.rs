use alloy::primitives::{Address, B256, U256};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::UserOperationReceipt;
use alloy::transports::{IntoBoxTransport, TransportResult};
use serde::{Deserialize, Serialize};
use wallet_aa_types::UserOperationHex;

/// A JSON-RPC client for an ERC-4337 bundler
#[derive(Debug, Clone)]
pub struct BundlerClient {
    pub inner: RpcClient,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UseropGasEstimation {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    #[serde(default, alias = "paymasterVerificationGas")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, alias = "paymasterPostOpGas")]
    pub paymaster_post_op_gas_limit: Option<U256>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPriceTier {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// `pimlico_getUserOperationGasPrice` result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserOperationGasPrice {
    pub slow: GasPriceTier,
    pub standard: GasPriceTier,
    pub fast: GasPriceTier,
}

impl BundlerClient {
    pub fn new(transport: impl IntoBoxTransport) -> Self {
        let client = RpcClient::builder().transport(transport, false);

        Self { inner: client }
    }

    pub async fn get_user_op_gas_price(&self) -> TransportResult<UserOperationGasPrice> {
        self.inner
            .request("pimlico_getUserOperationGasPrice", ())
            .await
    }

    pub async fn estimate_user_op_gas(
        &self,
        user_op: &UserOperationHex,
        entrypoint: Address,
    ) -> TransportResult<UseropGasEstimation> {
        self.inner
            .request("eth_estimateUserOperationGas", (user_op, entrypoint))
            .await
    }

    pub async fn send_user_op(
        &self,
        user_op: &UserOperationHex,
        entrypoint: Address,
    ) -> TransportResult<B256> {
        self.inner
            .request("eth_sendUserOperation", (user_op, entrypoint))
            .await
    }

    pub async fn get_user_op_receipt(
        &self,
        user_op_hash: B256,
    ) -> TransportResult<Option<UserOperationReceipt>> {
        self.inner
            .request("eth_getUserOperationReceipt", [user_op_hash])
            .await
    }
}
