use alloy::primitives::B256;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use wallet_aa_core::userop::builder::{
    PrepareCallsRequest, SendPreparedCallsRequest, SmartSessionUserOpBuilder,
};
use wallet_core::chain::ChainService;

use crate::http::{
    error::ApiWalletError, extractors::WalletJson, server::WalletServerState,
    types::SuccessResponse,
};

/// Prepare Calls
///
/// Build a smart session user operation for `calls` and return it with the hash to sign.
pub async fn prepare_calls(
    State(state): State<WalletServerState>,
    WalletJson(request): WalletJson<PrepareCallsRequest>,
) -> Result<impl IntoResponse, ApiWalletError> {
    tracing::info!(
        account = %request.from,
        chain_id = request.chain_id,
        calls = request.calls.len(),
        "Processing prepare calls request"
    );

    let chain = state.chains.get_chain(request.chain_id)?;
    let prepared = SmartSessionUserOpBuilder::new(&chain, &state.cosigner, &state.smart_sessions)
        .prepare_calls(&request)
        .await?;

    Ok(Json(SuccessResponse::new(prepared)))
}

/// Send Prepared Calls
///
/// Cosign a prepared user operation with the caller's signature and submit it.
pub async fn send_prepared_calls(
    State(state): State<WalletServerState>,
    WalletJson(request): WalletJson<SendPreparedCallsRequest>,
) -> Result<impl IntoResponse, ApiWalletError> {
    let chain_id = request.prepared_calls.chain_id;
    tracing::info!(
        account = %request.prepared_calls.user_op.sender,
        chain_id,
        "Processing send prepared calls request"
    );

    let chain = state.chains.get_chain(chain_id)?;
    let sent = SmartSessionUserOpBuilder::new(&chain, &state.cosigner, &state.smart_sessions)
        .send_prepared_calls(request)
        .await?;

    Ok(Json(SuccessResponse::new(sent)))
}

pub async fn user_op_receipt(
    State(state): State<WalletServerState>,
    Path((chain_id, user_op_hash)): Path<(u64, B256)>,
) -> Result<impl IntoResponse, ApiWalletError> {
    let chain = state.chains.get_chain(chain_id)?;
    let receipt = SmartSessionUserOpBuilder::new(&chain, &state.cosigner, &state.smart_sessions)
        .get_user_op_receipt(user_op_hash)
        .await?;

    Ok(Json(SuccessResponse::new(receipt)))
}
