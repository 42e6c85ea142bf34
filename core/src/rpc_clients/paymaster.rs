use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::client::RpcClient;
use alloy::transports::{IntoBoxTransport, TransportResult};
use serde::{Deserialize, Serialize};
use wallet_aa_types::UserOperationHex;

/// Paymaster sponsorship result for an EntryPoint v0.7 operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterResultV07 {
    pub pre_verification_gas: Option<U256>,
    pub verification_gas_limit: Option<U256>,
    pub call_gas_limit: Option<U256>,
    pub paymaster: Address,
    pub paymaster_data: Bytes,
    pub paymaster_verification_gas_limit: Option<U256>,
    pub paymaster_post_op_gas_limit: Option<U256>,
}

#[derive(Debug, Clone)]
pub struct PaymasterClient {
    pub inner: RpcClient,
}

impl PaymasterClient {
    pub fn new(transport: impl IntoBoxTransport) -> Self {
        let client = RpcClient::builder().transport(transport, false);
        Self { inner: client }
    }

    pub async fn sponsor_user_op(
        &self,
        userop: &UserOperationHex,
        entrypoint: Address,
    ) -> TransportResult<PaymasterResultV07> {
        self.inner
            .request("pm_sponsorUserOperation", (userop, entrypoint))
            .await
    }
}
