use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NO_MATCHING_ASSETS: i64 = 4100;
pub const CHECKOUT_EXPIRED: i64 = 4200;
pub const INSUFFICIENT_FUNDS: i64 = 4300;
pub const INVALID_CHECKOUT_REQUEST: i64 = 4600;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutError {
    #[error("No matching assets found for any accepted payment")]
    NoMatchingAssets,

    #[error("Checkout expired at {expiry}")]
    Expired { expiry: u64, now: u64 },

    #[error("Insufficient funds for every accepted payment")]
    InsufficientFunds,

    #[error("Invalid checkout request: {message}")]
    InvalidRequest { message: String },
}

/// JSON-RPC style error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CheckoutError {
    pub fn code(&self) -> i64 {
        match self {
            CheckoutError::NoMatchingAssets => NO_MATCHING_ASSETS,
            CheckoutError::Expired { .. } => CHECKOUT_EXPIRED,
            CheckoutError::InsufficientFunds => INSUFFICIENT_FUNDS,
            CheckoutError::InvalidRequest { .. } => INVALID_CHECKOUT_REQUEST,
        }
    }

    pub fn to_json_rpc_error(&self) -> JsonRpcError {
        let data = match self {
            CheckoutError::Expired { expiry, now } => {
                Some(serde_json::json!({ "expiry": expiry, "now": now }))
            }
            _ => None,
        };
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_checkout_protocol() {
        assert_eq!(CheckoutError::NoMatchingAssets.code(), 4100);
        assert_eq!(CheckoutError::Expired { expiry: 1, now: 2 }.code(), 4200);
        assert_eq!(CheckoutError::InsufficientFunds.code(), 4300);
        assert_eq!(
            CheckoutError::InvalidRequest {
                message: String::new()
            }
            .code(),
            4600
        );
    }

    #[test]
    fn json_rpc_error_carries_expiry_data() {
        let json =
            serde_json::to_value(CheckoutError::Expired { expiry: 10, now: 20 }.to_json_rpc_error())
                .unwrap();
        assert_eq!(json["code"], 4200);
        assert_eq!(json["data"]["expiry"], 10);

        let json = serde_json::to_value(CheckoutError::InsufficientFunds.to_json_rpc_error()).unwrap();
        assert!(json.get("data").is_none());
    }
}
