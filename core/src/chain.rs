use std::time::Duration;

use crate::rpc_clients::{BundlerClient, PaymasterClient, transport::SharedClientTransportBuilder};
use alloy::{
    providers::RootProvider,
    rpc::client::RpcClient,
    transports::http::reqwest::{ClientBuilder as HttpClientBuilder, Url},
};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_BUNDLER_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS},
    error::WalletError,
};

pub trait Chain: Send + Sync {
    fn chain_id(&self) -> u64;
    fn rpc_url(&self) -> Url;
    fn bundler_url(&self) -> Url;
    fn paymaster_url(&self) -> Option<Url>;

    fn provider(&self) -> &RootProvider;
    fn bundler_client(&self) -> &BundlerClient;
    /// `None` when operations on this chain are not sponsored.
    fn paymaster_client(&self) -> Option<&PaymasterClient>;
}

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_bundler_timeout() -> u64 {
    DEFAULT_BUNDLER_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub bundler_url: String,
    #[serde(default)]
    pub paymaster_url: Option<String>,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_bundler_timeout")]
    pub bundler_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RpcChain {
    chain_id: u64,
    rpc_url: Url,
    bundler_url: Url,
    paymaster_url: Option<Url>,

    pub provider: RootProvider,
    pub bundler_client: BundlerClient,
    pub paymaster_client: Option<PaymasterClient>,
}

impl Chain for RpcChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn rpc_url(&self) -> Url {
        self.rpc_url.clone()
    }

    fn bundler_url(&self) -> Url {
        self.bundler_url.clone()
    }

    fn paymaster_url(&self) -> Option<Url> {
        self.paymaster_url.clone()
    }

    fn provider(&self) -> &RootProvider {
        &self.provider
    }

    fn bundler_client(&self) -> &BundlerClient {
        &self.bundler_client
    }

    fn paymaster_client(&self) -> Option<&PaymasterClient> {
        self.paymaster_client.as_ref()
    }
}

fn parse_url(raw: &str, what: &str) -> Result<Url, WalletError> {
    Url::parse(raw).map_err(|e| WalletError::RpcConfigError {
        message: format!("Failed to parse {what} URL: {e}"),
    })
}

impl ChainConfig {
    pub fn to_chain(&self) -> Result<RpcChain, WalletError> {
        let rpc_url = parse_url(&self.rpc_url, "RPC")?;
        let bundler_url = parse_url(&self.bundler_url, "Bundler")?;
        let paymaster_url = self
            .paymaster_url
            .as_deref()
            .map(|url| parse_url(url, "Paymaster"))
            .transpose()?;

        let reqwest_client =
            HttpClientBuilder::new()
                .build()
                .map_err(|e| WalletError::RpcConfigError {
                    message: format!("Failed to build HTTP client: {e}"),
                })?;

        let transport_builder = SharedClientTransportBuilder::new(reqwest_client);
        let read_timeout = Duration::from_secs(self.read_timeout_secs);
        let bundler_timeout = Duration::from_secs(self.bundler_timeout_secs);

        let provider_transport = transport_builder.default_transport(rpc_url.clone(), read_timeout);
        let bundler_transport =
            transport_builder.default_transport(bundler_url.clone(), bundler_timeout);

        let paymaster_client = paymaster_url.as_ref().map(|url| {
            PaymasterClient::new(transport_builder.default_transport(url.clone(), bundler_timeout))
        });

        Ok(RpcChain {
            chain_id: self.chain_id,
            provider: RootProvider::new(RpcClient::builder().transport(provider_transport, false)),
            bundler_client: BundlerClient::new(bundler_transport),
            paymaster_client,
            rpc_url,
            bundler_url,
            paymaster_url,
        })
    }
}

pub trait ChainService {
    fn get_chain(&self, chain_id: u64) -> Result<impl Chain + Clone, WalletError>;
}

/// Chains built once from configuration, looked up by id.
#[derive(Clone, Debug, Default)]
pub struct ConfiguredChains {
    chains: Vec<RpcChain>,
}

impl ConfiguredChains {
    pub fn from_configs(configs: &[ChainConfig]) -> Result<Self, WalletError> {
        let chains = configs
            .iter()
            .map(ChainConfig::to_chain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { chains })
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.chains.iter().map(|chain| chain.chain_id)
    }
}

impl ChainService for ConfiguredChains {
    fn get_chain(&self, chain_id: u64) -> Result<impl Chain + Clone, WalletError> {
        self.chains
            .iter()
            .find(|chain| chain.chain_id == chain_id)
            .cloned()
            .ok_or_else(|| WalletError::RpcConfigError {
                message: format!("Chain {chain_id} is not configured"),
            })
    }
}
