pub mod config;
pub mod http;

pub use config::{LogFormat, ServerConfig, WalletConfig};
pub use http::server::{WalletServer, WalletServerState};
