use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use wallet_core::error::WalletError;

use crate::http::error::ApiWalletError;

/// JSON extractor that reports body errors in the API error format.
pub struct WalletJson<T>(pub T);

impl<T, S> FromRequest<S> for WalletJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiWalletError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(data)) => Ok(WalletJson(data)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err),
                    JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing or invalid Content-Type header. Expected application/json"
                            .to_string()
                    }
                    JsonRejection::BytesRejection(err) => {
                        format!("Failed to read request body: {}", err)
                    }
                    _ => "Invalid JSON request".to_string(),
                };

                Err(ApiWalletError::Wallet(WalletError::ValidationError { message }))
            }
        }
    }
}
