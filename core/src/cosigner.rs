//! Client for the remote cosigning service.
//!
//! Every route is scoped by the smart account address and a `projectId` query parameter.
//! A non-2xx answer becomes [`CosignerError::Api`] with the raw status and body; a request
//! that never got an answer becomes [`CosignerError::Transport`].

use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{Instrument, debug, debug_span, warn};
use url::Url;
use wallet_aa_types::UserOperationHex;

use crate::constants::DEFAULT_COSIGNER_TIMEOUT_SECS;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CosignerError {
    /// The cosigner answered with a non-2xx status.
    #[error("cosigner rejected request with status {status}: {body}")]
    Api { status: u16, body: String },

    /// No response was received.
    #[error("cosigner unreachable: {message}")]
    Transport { message: String, timeout: bool },

    #[error("invalid cosigner response: {message}")]
    InvalidResponse { message: String },

    #[error("invalid cosigner url: {message}")]
    Url { message: String },
}

impl CosignerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CosignerError::Transport { .. } => true,
            CosignerError::Api { status, .. } => *status == 429 || *status >= 500,
            CosignerError::InvalidResponse { .. } | CosignerError::Url { .. } => false,
        }
    }
}

impl From<reqwest::Error> for CosignerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return CosignerError::InvalidResponse {
                message: error.to_string(),
            };
        }
        CosignerError::Transport {
            timeout: error.is_timeout(),
            message: error.to_string(),
        }
    }
}

/// How a deployment exposes context lookup by pci.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLookup {
    /// `GET /{address}/{pci}`
    #[default]
    PathSegment,
    /// `GET /{address}/getcontext?pci=...`
    GetContextQuery,
}

fn default_cosigner_timeout() -> u64 {
    DEFAULT_COSIGNER_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosignerConfig {
    pub base_url: String,
    pub project_id: String,
    #[serde(default = "default_cosigner_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub context_lookup: ContextLookup,
}

/// Key material as exchanged with the cosigner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosignerKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerData {
    pub keys: Vec<CosignerKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSigner {
    #[serde(rename = "type")]
    pub signer_type: String,
    pub data: SignerData,
}

/// A permission or policy entry; `data` is forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedEntry {
    #[serde(rename = "type")]
    pub entry_type: String,
    pub data: serde_json::Value,
}

/// Permission grant registered with `POST /{address}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrantRequest {
    /// `0x`-prefixed chain id.
    pub chain_id: String,
    pub expiry: u64,
    pub signer: PermissionSigner,
    pub permissions: Vec<TypedEntry>,
    pub policies: Vec<TypedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPermissionResponse {
    pub pci: String,
    pub key: CosignerKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivatePermissionRequest {
    pub pci: String,
    pub context: Bytes,
    #[serde(flatten)]
    pub grant: PermissionGrantRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionContextResponse {
    pub context: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoSignRequest {
    pub pci: String,
    pub user_op: UserOperationHex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoSignResponse {
    pub signature: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionList {
    pub pci: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokePermissionRequest {
    pub pci: String,
    pub signature: Bytes,
}

#[derive(Debug, Clone)]
pub struct CosignerClient {
    base_url: Url,
    project_id: String,
    context_lookup: ContextLookup,
    http_client: reqwest::Client,
}

impl CosignerClient {
    pub fn new(config: &CosignerConfig) -> Result<Self, CosignerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CosignerError::Transport {
                message: format!("failed to build http client: {e}"),
                timeout: false,
            })?;

        Self::with_http_client(config, http_client)
    }

    pub fn with_http_client(
        config: &CosignerConfig,
        http_client: reqwest::Client,
    ) -> Result<Self, CosignerError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| CosignerError::Url {
            message: format!("{}: {e}", config.base_url),
        })?;

        Ok(Self {
            base_url,
            project_id: config.project_id.clone(),
            context_lookup: config.context_lookup,
            http_client,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CosignerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CosignerError::Url {
                message: format!("{} cannot be a base url", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("projectId", &self.project_id);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CosignerError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(?status, "received response from cosigner");

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%status, error = %e, "Failed to read cosigner error body");
                    String::new()
                }
            };
            return Err(CosignerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CosignerError> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| CosignerError::InvalidResponse {
            message: format!("{e}: {}", String::from_utf8_lossy(&body)),
        })
    }

    /// Register a permission that is not active yet.
    pub async fn add_permission(
        &self,
        address: Address,
        request: &PermissionGrantRequest,
    ) -> Result<AddPermissionResponse, CosignerError> {
        let url = self.url(&[&address.to_string()])?;
        self.send_json(self.http_client.post(url).json(request))
            .instrument(debug_span!("cosigner_add_permission", %address))
            .await
    }

    /// Bind a pci to the permission context produced once the session was enabled.
    pub async fn activate_permissions(
        &self,
        address: Address,
        request: &ActivatePermissionRequest,
    ) -> Result<(), CosignerError> {
        let url = self.url(&[&address.to_string(), "activate"])?;
        self.send(self.http_client.post(url).json(request))
            .instrument(debug_span!("cosigner_activate", %address, pci = %request.pci))
            .await?;
        Ok(())
    }

    /// Resolve a pci to its permission context. Safe to call repeatedly.
    pub async fn get_permissions_context(
        &self,
        address: Address,
        pci: &str,
    ) -> Result<PermissionContextResponse, CosignerError> {
        let address = address.to_string();
        let url = match self.context_lookup {
            ContextLookup::PathSegment => self.url(&[&address, pci])?,
            ContextLookup::GetContextQuery => {
                let mut url = self.url(&[&address, "getcontext"])?;
                url.query_pairs_mut().append_pair("pci", pci);
                url
            }
        };
        self.send_json(self.http_client.get(url))
            .instrument(debug_span!("cosigner_get_context", %address, %pci))
            .await
    }

    /// Ask the cosigner for its signature over a fully formed user operation.
    pub async fn co_sign_user_operation(
        &self,
        address: Address,
        request: &CoSignRequest,
    ) -> Result<CoSignResponse, CosignerError> {
        let url = self.url(&[&address.to_string(), "sign"])?;
        self.send_json(self.http_client.post(url).json(request))
            .instrument(debug_span!("cosigner_sign", %address, pci = %request.pci))
            .await
    }

    pub async fn list_permissions(&self, address: Address) -> Result<PermissionList, CosignerError> {
        let url = self.url(&[&address.to_string()])?;
        self.send_json(self.http_client.get(url))
            .instrument(debug_span!("cosigner_list_permissions", %address))
            .await
    }

    pub async fn revoke_permission(
        &self,
        address: Address,
        request: &RevokePermissionRequest,
    ) -> Result<(), CosignerError> {
        let url = self.url(&[&address.to_string(), "revoke"])?;
        self.send(self.http_client.post(url).json(request))
            .instrument(debug_span!("cosigner_revoke", %address, pci = %request.pci))
            .await?;
        Ok(())
    }
}
