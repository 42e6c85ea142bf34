use std::env;

use config::{Config, File};
use serde::Deserialize;
use wallet_aa_core::userop::builder::SmartSessionConfig;
use wallet_core::{chain::ChainConfig, cosigner::CosignerConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub server: ServerConfig,
    pub cosigner: CosignerConfig,
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub smart_sessions: SmartSessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".into(),
            log_format: LogFormat::Pretty,
        }
    }
}

pub fn get_config() -> WalletConfig {
    let base_path = env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    // Detect the running environment
    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");

    let environment_filename = format!("server_{}.yaml", environment.as_str());

    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("server_base.yaml")))
        .add_source(File::from(configuration_directory.join(environment_filename)).required(false))
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Configuration error: {}", e);
            panic!("Failed to build configuration");
        });

    config.try_deserialize::<WalletConfig>().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        eprintln!(
            "Make sure all required fields are set correctly in your configuration files or environment variables."
        );
        panic!("Failed to deserialize configuration");
    })
}

/// The possible runtime environment for our application.
pub enum Environment {
    Local,
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local`, `development`, or `production`.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn yaml_with_defaults_deserializes() {
        let yaml = r#"
server:
  port: 8080
  log_format: json
cosigner:
  base_url: https://cosigner.example/v1/sessions
  project_id: demo
chains:
  - chain_id: 8453
    rpc_url: https://rpc.example/8453
    bundler_url: https://bundler.example/8453
"#;
        let config: WalletConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.cosigner.timeout_secs, 10);
        assert_eq!(config.chains[0].bundler_timeout_secs, 30);
        assert!(config.chains[0].paymaster_url.is_none());
        assert_eq!(
            config.smart_sessions.entrypoint,
            wallet_core::constants::ENTRYPOINT_ADDRESS_V0_7
        );
    }

    #[test]
    fn rejects_unknown_environment() {
        let env: Result<Environment, _> = "staging".to_string().try_into();
        assert!(env.is_err());
    }
}
