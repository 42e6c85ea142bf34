use alloy::{
    primitives::{Address, U256, aliases::U192},
    sol,
};
use wallet_core::{
    chain::Chain,
    error::{ContractErrorToWalletError, WalletError},
};

use crate::smart_session::{PermissionContext, SmartSessionError};

sol! {
    #[sol(rpc)]
    interface IEntryPointNonces {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }
}

/// ERC-4337 nonce key for a validator module: the address right-padded to 24 bytes.
pub fn key_from_validator_address(validator_address: Address) -> U192 {
    U192::from_be_bytes({
        let mut key = [0u8; 24];
        key[..20].copy_from_slice(validator_address.as_slice());
        key
    })
}

/// Nonce key for a raw permission context, after checking that the context targets the
/// expected session module.
pub fn key_from_permission_context(
    context: &[u8],
    expected_validator: Address,
) -> Result<U192, SmartSessionError> {
    let context = PermissionContext::parse(context, expected_validator)?;
    Ok(key_from_validator_address(context.validator))
}

pub async fn get_nonce_with_key(
    chain: &impl Chain,
    entrypoint: Address,
    sender: Address,
    key: U192,
) -> Result<U256, WalletError> {
    let entrypoint_contract = IEntryPointNonces::new(entrypoint, chain.provider().clone());

    let nonce = entrypoint_contract
        .getNonce(sender, key)
        .call()
        .await
        .map_err(|e| e.to_wallet_error(chain, entrypoint))?;

    tracing::debug!(%sender, %nonce, "Fetched account nonce");
    Ok(nonce)
}
