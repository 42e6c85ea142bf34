use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::http::{server::WalletServerState, types::SuccessResponse};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    chain_ids: Vec<u64>,
}

pub async fn health(State(state): State<WalletServerState>) -> Json<SuccessResponse<HealthResponse>> {
    Json(SuccessResponse::new(HealthResponse {
        status: "ok",
        chain_ids: state.chains.chain_ids().collect(),
    }))
}
