use alloy::primitives::Address;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use wallet_payments::checkout::CheckoutRequest;

use crate::http::{
    error::ApiWalletError, extractors::WalletJson, server::WalletServerState,
    types::SuccessResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasiblePaymentsRequest {
    /// The account that would pay.
    pub account: Address,
    #[serde(flatten)]
    pub checkout: CheckoutRequest,
}

/// Feasible Payments
///
/// Filter a checkout's accepted payments to the ones `account` can complete.
pub async fn feasible_payments(
    State(state): State<WalletServerState>,
    WalletJson(request): WalletJson<FeasiblePaymentsRequest>,
) -> Result<impl IntoResponse, ApiWalletError> {
    let feasible = state
        .payments
        .get_feasible_payments(request.account, &request.checkout)
        .await?;

    Ok(Json(SuccessResponse::new(feasible)))
}
