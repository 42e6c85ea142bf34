use alloy::{
    primitives::Address,
    transports::{RpcError as AlloyRpcError, TransportErrorKind},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{chain::Chain, cosigner::CosignerError};

#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcErrorKind {
    /// Server returned an error response.
    #[error("server returned an error response: {0}")]
    ErrorResp(RpcErrorResponse),

    /// Server returned a null response when a non-null response was expected.
    #[error("server returned a null response when a non-null response was expected")]
    NullResp,

    #[error("unsupported feature: {message}")]
    UnsupportedFeature { message: String },

    /// A local pre-processing step failed.
    #[error("local usage error: {message}")]
    InternalError { message: String },

    #[error("serialization error: {message}")]
    SerError { message: String },

    #[error("deserialization error: {message}, text: {text}")]
    DeserError { message: String, text: String },

    #[error("HTTP error {status}")]
    TransportHttpError { status: u16, body: String },

    /// Connection failures and timeouts land here.
    #[error("Other transport error: {message}")]
    OtherTransportError { message: String },
}

impl RpcErrorKind {
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcErrorKind::TransportHttpError { status, .. } => *status == 429 || *status >= 500,
            RpcErrorKind::OtherTransportError { .. } | RpcErrorKind::NullResp => true,
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcErrorResponse {
    pub code: i64,
    pub message: String,
    pub data: Option<String>,
}

impl std::fmt::Display for RpcErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)?;
        if let Some(data) = &self.data {
            write!(f, ", data: {data}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum WalletError {
    #[error("RPC error on chain {chain_id} at {rpc_url}: {message}")]
    RpcError {
        chain_id: u64,
        rpc_url: String,
        message: String,
        kind: RpcErrorKind,
    },

    #[error("Paymaster error on chain {chain_id} at {rpc_url}: {message}")]
    PaymasterError {
        chain_id: u64,
        rpc_url: String,
        message: String,
        kind: RpcErrorKind,
    },

    #[error("Bundler error on chain {chain_id} at {rpc_url}: {message}")]
    BundlerError {
        chain_id: u64,
        rpc_url: String,
        message: String,
        kind: RpcErrorKind,
    },

    #[error("Cosigner error: {error}")]
    CosignerError {
        #[from]
        error: CosignerError,
    },

    /// Unknown mode byte, unknown signer type, malformed identifiers and the like.
    #[error("Encoding error: {message}")]
    EncodingError { message: String },

    #[error("Invalid permission context: {message}")]
    InvalidPermissionContext { message: String },

    #[error("Contract call failed on chain {chain_id}: {message}")]
    #[serde(rename_all = "camelCase")]
    ContractCallError {
        chain_id: u64,
        contract_address: Option<Address>,
        message: String,
    },

    #[error("Bad RPC configuration: {message}")]
    RpcConfigError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl WalletError {
    /// Transport failures and timeouts may be retried; everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            WalletError::RpcError { kind, .. }
            | WalletError::PaymasterError { kind, .. }
            | WalletError::BundlerError { kind, .. } => kind.is_retryable(),
            WalletError::CosignerError { error } => error.is_retryable(),
            WalletError::ContractCallError { .. }
            | WalletError::EncodingError { .. }
            | WalletError::InvalidPermissionContext { .. }
            | WalletError::RpcConfigError { .. }
            | WalletError::ValidationError { .. }
            | WalletError::InternalError { .. } => false,
        }
    }
}

pub trait AlloyRpcErrorToWalletError {
    fn to_wallet_error(&self, chain: &impl Chain) -> WalletError;
    fn to_bundler_error(&self, chain: &impl Chain) -> WalletError;
    fn to_paymaster_error(&self, chain: &impl Chain) -> WalletError;
}

fn to_rpc_error_kind(err: &AlloyRpcError<TransportErrorKind>) -> RpcErrorKind {
    match err {
        AlloyRpcError::ErrorResp(err) => RpcErrorKind::ErrorResp(RpcErrorResponse {
            code: err.code,
            message: err.message.to_string(),
            data: err.data.as_ref().map(|data| data.to_string()),
        }),
        AlloyRpcError::NullResp => RpcErrorKind::NullResp,
        AlloyRpcError::UnsupportedFeature(feature) => RpcErrorKind::UnsupportedFeature {
            message: feature.to_string(),
        },
        AlloyRpcError::LocalUsageError(err) => RpcErrorKind::InternalError {
            message: err.to_string(),
        },
        AlloyRpcError::SerError(err) => RpcErrorKind::SerError {
            message: err.to_string(),
        },
        AlloyRpcError::DeserError { err, text } => RpcErrorKind::DeserError {
            message: err.to_string(),
            text: text.to_string(),
        },
        AlloyRpcError::Transport(TransportErrorKind::HttpError(err)) => {
            RpcErrorKind::TransportHttpError {
                status: err.status,
                body: err.body.to_string(),
            }
        }
        AlloyRpcError::Transport(err) => RpcErrorKind::OtherTransportError {
            message: err.to_string(),
        },
    }
}

impl AlloyRpcErrorToWalletError for AlloyRpcError<TransportErrorKind> {
    fn to_wallet_error(&self, chain: &impl Chain) -> WalletError {
        WalletError::RpcError {
            chain_id: chain.chain_id(),
            rpc_url: chain.rpc_url().to_string(),
            message: self.to_string(),
            kind: to_rpc_error_kind(self),
        }
    }

    fn to_bundler_error(&self, chain: &impl Chain) -> WalletError {
        WalletError::BundlerError {
            chain_id: chain.chain_id(),
            rpc_url: chain.bundler_url().to_string(),
            message: self.to_string(),
            kind: to_rpc_error_kind(self),
        }
    }

    fn to_paymaster_error(&self, chain: &impl Chain) -> WalletError {
        WalletError::PaymasterError {
            chain_id: chain.chain_id(),
            rpc_url: chain
                .paymaster_url()
                .map(|url| url.to_string())
                .unwrap_or_default(),
            message: self.to_string(),
            kind: to_rpc_error_kind(self),
        }
    }
}

pub trait ContractErrorToWalletError {
    fn to_wallet_error(self, chain: &impl Chain, contract_address: Address) -> WalletError;
}

impl ContractErrorToWalletError for alloy::contract::Error {
    fn to_wallet_error(self, chain: &impl Chain, contract_address: Address) -> WalletError {
        match self {
            alloy::contract::Error::TransportError(err) => err.to_wallet_error(chain),
            other => WalletError::ContractCallError {
                chain_id: chain.chain_id(),
                contract_address: Some(contract_address),
                message: other.to_string(),
            },
        }
    }
}
