use alloy::{
    core::sol_types::SolValue,
    primitives::{Address, B256, Bytes, ChainId, U256, keccak256},
    rpc::types::PackedUserOperation,
};
use serde::{Deserialize, Serialize};

/// ERC-4337 v0.7 user operation in its unpacked RPC form
pub type UserOperationV07 = PackedUserOperation;

/// Error type for UserOp operations
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserOpError {
    #[error("{field} does not fit in 128 bits")]
    GasFieldOverflow { field: String },
}

/// Operation with only sender, nonce and call data set; gas fields and signature are filled later.
pub fn unsigned_user_op(sender: Address, nonce: U256, call_data: Bytes) -> UserOperationV07 {
    PackedUserOperation {
        sender,
        nonce,
        factory: None,
        factory_data: None,
        call_data,
        call_gas_limit: U256::ZERO,
        verification_gas_limit: U256::ZERO,
        pre_verification_gas: U256::ZERO,
        max_fee_per_gas: U256::ZERO,
        max_priority_fee_per_gas: U256::ZERO,
        paymaster: None,
        paymaster_data: None,
        paymaster_verification_gas_limit: None,
        paymaster_post_op_gas_limit: None,
        signature: Bytes::new(),
    }
}

fn to_u128(value: U256, field: &str) -> Result<u128, UserOpError> {
    value.try_into().map_err(|_| UserOpError::GasFieldOverflow {
        field: field.to_string(),
    })
}

/// Packs two 128-bit gas values into one word, high half first
fn pack_u128_pair(high: u128, low: u128) -> B256 {
    let mut packed = [0u8; 32];
    packed[0..16].copy_from_slice(&high.to_be_bytes());
    packed[16..32].copy_from_slice(&low.to_be_bytes());
    B256::from(packed)
}

/// `factory ∥ factoryData`, or empty when no factory is set
pub fn init_code(op: &UserOperationV07) -> Bytes {
    match op.factory {
        Some(factory) if factory != Address::ZERO => [
            &factory[..],
            &op.factory_data.clone().unwrap_or_default()[..],
        ]
        .concat()
        .into(),
        _ => Bytes::default(),
    }
}

/// `paymaster ∥ verificationGas ∥ postOpGas ∥ paymasterData`, or empty when no paymaster is set
pub fn paymaster_and_data(op: &UserOperationV07) -> Result<Bytes, UserOpError> {
    match op.paymaster {
        Some(paymaster) if paymaster != Address::ZERO => {
            let verification = to_u128(
                op.paymaster_verification_gas_limit.unwrap_or_default(),
                "paymaster_verification_gas_limit",
            )?;
            let post_op = to_u128(
                op.paymaster_post_op_gas_limit.unwrap_or_default(),
                "paymaster_post_op_gas_limit",
            )?;
            Ok([
                &paymaster[..],
                &verification.to_be_bytes()[..],
                &post_op.to_be_bytes()[..],
                &op.paymaster_data.clone().unwrap_or_default()[..],
            ]
            .concat()
            .into())
        }
        _ => Ok(Bytes::default()),
    }
}

/// Compute the EntryPoint v0.7 `getUserOpHash` for an operation.
///
/// The signature field is not part of the hash, so the same hash is valid for the
/// dummy, caller and cosigned signatures of one operation.
pub fn compute_user_op_v07_hash(
    op: &UserOperationV07,
    entrypoint: Address,
    chain_id: ChainId,
) -> Result<B256, UserOpError> {
    let account_gas_limits = pack_u128_pair(
        to_u128(op.verification_gas_limit, "verification_gas_limit")?,
        to_u128(op.call_gas_limit, "call_gas_limit")?,
    );

    let gas_fees = pack_u128_pair(
        to_u128(op.max_priority_fee_per_gas, "max_priority_fee_per_gas")?,
        to_u128(op.max_fee_per_gas, "max_fee_per_gas")?,
    );

    let inner_tuple = (
        op.sender,
        op.nonce,
        keccak256(init_code(op)),
        keccak256(&op.call_data),
        account_gas_limits,
        op.pre_verification_gas,
        gas_fees,
        keccak256(paymaster_and_data(op)?),
    );
    let inner_hash = keccak256(inner_tuple.abi_encode());

    let outer_tuple = (inner_hash, entrypoint, U256::from(chain_id));
    Ok(keccak256(outer_tuple.abi_encode()))
}

/// Wire form of a v0.7 user operation where every numeric field is a `0x` hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationHex {
    pub sender: Address,
    pub nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: String,
    pub verification_gas_limit: String,
    pub pre_verification_gas: String,
    pub max_fee_per_gas: String,
    pub max_priority_fee_per_gas: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

fn hex_quantity(value: U256) -> String {
    format!("{value:#x}")
}

impl From<&UserOperationV07> for UserOperationHex {
    fn from(op: &UserOperationV07) -> Self {
        Self {
            sender: op.sender,
            nonce: hex_quantity(op.nonce),
            factory: op.factory,
            factory_data: op.factory_data.clone(),
            call_data: op.call_data.clone(),
            call_gas_limit: hex_quantity(op.call_gas_limit),
            verification_gas_limit: hex_quantity(op.verification_gas_limit),
            pre_verification_gas: hex_quantity(op.pre_verification_gas),
            max_fee_per_gas: hex_quantity(op.max_fee_per_gas),
            max_priority_fee_per_gas: hex_quantity(op.max_priority_fee_per_gas),
            paymaster: op.paymaster,
            paymaster_verification_gas_limit: op.paymaster_verification_gas_limit.map(hex_quantity),
            paymaster_post_op_gas_limit: op.paymaster_post_op_gas_limit.map(hex_quantity),
            paymaster_data: op.paymaster_data.clone(),
            signature: op.signature.clone(),
        }
    }
}
