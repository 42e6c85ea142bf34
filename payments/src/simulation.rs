use std::future::Future;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, U64, U256},
    providers::Provider,
    rpc::{json_rpc::ErrorPayload, types::TransactionRequest},
    sol,
    sol_types::SolCall,
    transports::{RpcError, TransportErrorKind},
};
use serde::{Deserialize, Serialize};
use wallet_core::{
    chain::{Chain, ChainService},
    error::{AlloyRpcErrorToWalletError, ContractErrorToWalletError, WalletError},
    transaction::Call,
};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// The asset a payment moves, resolved from its CAIP-19 asset namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Erc20(Address),
}

impl Asset {
    /// Token address, with the zero address standing in for the native asset.
    pub fn token_address(&self) -> Address {
        match self {
            Asset::Native => Address::ZERO,
            Asset::Erc20(token) => *token,
        }
    }

    pub fn transfer_call(&self, recipient: Address, amount: U256) -> Call {
        match self {
            Asset::Native => Call::new(recipient, amount, Bytes::new()),
            Asset::Erc20(token) => Call::new(
                *token,
                U256::ZERO,
                IERC20::transferCall {
                    to: recipient,
                    amount,
                }
                .abi_encode()
                .into(),
            ),
        }
    }
}

pub trait AssetReader: Send + Sync {
    fn balance_of(
        &self,
        chain_id: u64,
        asset: Asset,
        account: Address,
    ) -> impl Future<Output = Result<U256, WalletError>> + Send;
}

pub trait PaymentSimulator: Send + Sync {
    /// `Ok(false)` when the chain executed the calls and they failed. `Err` is reserved
    /// for cases where the chain could not be asked at all.
    fn simulate_calls(
        &self,
        chain_id: u64,
        from: Address,
        calls: &[Call],
    ) -> impl Future<Output = Result<bool, WalletError>> + Send;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulatePayload {
    block_state_calls: Vec<SimulateBlock>,
    validation: bool,
}

#[derive(Debug, Clone, Serialize)]
struct SimulateBlock {
    calls: Vec<TransactionRequest>,
}

#[derive(Debug, Deserialize)]
struct SimulatedBlock {
    calls: Vec<SimulatedCall>,
}

#[derive(Debug, Deserialize)]
struct SimulatedCall {
    status: U64,
}

/// Node rejected the call because executing it fails, as opposed to being unreachable.
fn is_execution_failure(payload: &ErrorPayload) -> bool {
    if payload.as_revert_data().is_some() {
        return true;
    }
    let message = payload.message.to_lowercase();
    message.contains("revert")
        || message.contains("insufficient")
        || message.contains("exceeds balance")
}

fn simulation_outcome(
    result: Result<bool, RpcError<TransportErrorKind>>,
    chain: &impl Chain,
) -> Result<bool, WalletError> {
    match result {
        Ok(success) => Ok(success),
        Err(RpcError::ErrorResp(payload)) if is_execution_failure(&payload) => {
            tracing::debug!(
                chain_id = chain.chain_id(),
                code = payload.code,
                message = %payload.message,
                "Payment simulation failed"
            );
            Ok(false)
        }
        Err(e) => Err(e.to_wallet_error(chain)),
    }
}

fn to_request(from: Address, call: &Call) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(from)
        .with_to(call.to)
        .with_value(call.value)
        .with_input(call.data.clone())
}

/// Reads balances and simulates payments against configured chain RPCs.
#[derive(Clone, Debug)]
pub struct RpcPaymentBackend<CS> {
    pub chains: CS,
}

impl<CS: ChainService> RpcPaymentBackend<CS> {
    pub fn new(chains: CS) -> Self {
        Self { chains }
    }
}

impl<CS: ChainService + Send + Sync> AssetReader for RpcPaymentBackend<CS> {
    async fn balance_of(
        &self,
        chain_id: u64,
        asset: Asset,
        account: Address,
    ) -> Result<U256, WalletError> {
        let chain = self.chains.get_chain(chain_id)?;
        match asset {
            Asset::Native => chain
                .provider()
                .get_balance(account)
                .await
                .map_err(|e| e.to_wallet_error(&chain)),
            Asset::Erc20(token) => IERC20::new(token, chain.provider().clone())
                .balanceOf(account)
                .call()
                .await
                .map_err(|e| e.to_wallet_error(&chain, token)),
        }
    }
}

impl<CS: ChainService + Send + Sync> PaymentSimulator for RpcPaymentBackend<CS> {
    async fn simulate_calls(
        &self,
        chain_id: u64,
        from: Address,
        calls: &[Call],
    ) -> Result<bool, WalletError> {
        let chain = self.chains.get_chain(chain_id)?;

        // A lone call only needs gas estimation. Batches may depend on earlier calls
        // (approve then pay), so they run through eth_simulateV1 in one block.
        let result = match calls {
            [] => Ok(true),
            [call] => chain
                .provider()
                .estimate_gas(to_request(from, call))
                .await
                .map(|_| true),
            calls => {
                let payload = SimulatePayload {
                    block_state_calls: vec![SimulateBlock {
                        calls: calls.iter().map(|call| to_request(from, call)).collect(),
                    }],
                    validation: false,
                };
                chain
                    .provider()
                    .client()
                    .request::<_, Vec<SimulatedBlock>>("eth_simulateV1", (payload, "latest"))
                    .await
                    .map(|blocks| {
                        blocks
                            .iter()
                            .flat_map(|block| block.calls.iter())
                            .all(|call| call.status == U64::from(1))
                    })
            }
        };

        simulation_outcome(result, &chain)
    }
}
