use axum::{Json, http::StatusCode, response::IntoResponse};
use wallet_core::{
    cosigner::CosignerError,
    error::{RpcErrorKind, WalletError},
};
use wallet_payments::error::CheckoutError;

use crate::http::types::{ErrorObject, ErrorResponse};

pub enum ApiWalletError {
    Wallet(WalletError),
    Checkout(CheckoutError),
}

impl From<WalletError> for ApiWalletError {
    fn from(error: WalletError) -> Self {
        ApiWalletError::Wallet(error)
    }
}

impl From<CheckoutError> for ApiWalletError {
    fn from(error: CheckoutError) -> Self {
        ApiWalletError::Checkout(error)
    }
}

impl IntoResponse for ApiWalletError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let error = match self {
            ApiWalletError::Wallet(error) => ErrorObject {
                code: i64::from(status.as_u16()),
                message: error.to_string(),
                data: serde_json::to_value(&error).ok(),
            },
            ApiWalletError::Checkout(error) => {
                let rpc_error = error.to_json_rpc_error();
                ErrorObject {
                    code: rpc_error.code,
                    message: rpc_error.message,
                    data: rpc_error.data,
                }
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl ApiWalletError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiWalletError::Wallet(error) => wallet_error_status(error),
            ApiWalletError::Checkout(error) => match error {
                CheckoutError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
                CheckoutError::Expired { .. } => StatusCode::GONE,
                CheckoutError::NoMatchingAssets | CheckoutError::InsufficientFunds => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            },
        }
    }
}

fn wallet_error_status(error: &WalletError) -> StatusCode {
    match error {
        WalletError::RpcError { kind, .. } => match kind {
            RpcErrorKind::NullResp => StatusCode::BAD_GATEWAY,
            RpcErrorKind::ErrorResp(_) => StatusCode::BAD_GATEWAY,
            RpcErrorKind::UnsupportedFeature { .. } => StatusCode::NOT_IMPLEMENTED,
            RpcErrorKind::TransportHttpError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::SERVICE_UNAVAILABLE,
        },
        WalletError::CosignerError { error } => match error {
            CosignerError::Api { status, .. } if (400..500).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            CosignerError::Api { .. } | CosignerError::InvalidResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            CosignerError::Transport { timeout: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            CosignerError::Transport { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CosignerError::Url { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
        WalletError::EncodingError { .. } | WalletError::InvalidPermissionContext { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        WalletError::ContractCallError { .. } => StatusCode::BAD_GATEWAY,
        WalletError::RpcConfigError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        WalletError::BundlerError { .. } => StatusCode::BAD_REQUEST,
        WalletError::PaymasterError { .. } => StatusCode::BAD_REQUEST,
        WalletError::ValidationError { .. } => StatusCode::BAD_REQUEST,
        WalletError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
