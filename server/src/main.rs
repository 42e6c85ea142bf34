use std::sync::Arc;

use wallet_core::{chain::ConfiguredChains, cosigner::CosignerClient};
use wallet_payments::{
    registry::StaticAssetRegistry, simulation::RpcPaymentBackend,
    validator::PaymentFeasibilityValidator,
};
use wallet_server::{
    config,
    http::server::{WalletServer, WalletServerState},
};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::get_config();

    let subscriber = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "wallet_server=debug,wallet_core=debug,wallet_aa_core=debug,wallet_payments=debug,tower_http=debug"
                .into()
        }),
    );

    match config.server.log_format {
        config::LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        config::LogFormat::Pretty => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }

    let chains = ConfiguredChains::from_configs(&config.chains)?;
    tracing::info!(chains = config.chains.len(), "Chains configured");

    let cosigner = CosignerClient::new(&config.cosigner)?;
    tracing::info!(base_url = %config.cosigner.base_url, "Cosigner client initialized");

    let payments = PaymentFeasibilityValidator::new(
        RpcPaymentBackend::new(chains.clone()),
        StaticAssetRegistry::with_defaults(),
    );

    let mut server = WalletServer::new(WalletServerState {
        chains: Arc::new(chains),
        cosigner: Arc::new(cosigner),
        smart_sessions: Arc::new(config.smart_sessions.clone()),
        payments: Arc::new(payments),
    });

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    server.start(listener)?;

    tracing::info!("Server started, waiting for shutdown signal");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
    }
    tracing::info!("Shutdown signal received");

    if let Err(e) = server.shutdown().await {
        tracing::error!("Error during shutdown: {}", e);
    } else {
        tracing::info!("Server shut down successfully");
    }

    Ok(())
}
