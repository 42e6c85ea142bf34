use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{sync::watch, task::JoinHandle};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use wallet_aa_core::userop::builder::SmartSessionConfig;
use wallet_core::{chain::ConfiguredChains, cosigner::CosignerClient};
use wallet_payments::{
    registry::StaticAssetRegistry, simulation::RpcPaymentBackend,
    validator::PaymentFeasibilityValidator,
};

use super::routes::{
    calls::{prepare_calls, send_prepared_calls, user_op_receipt},
    checkout::feasible_payments,
    health::health,
};

pub type FeasibilityValidator =
    PaymentFeasibilityValidator<RpcPaymentBackend<ConfiguredChains>, StaticAssetRegistry>;

#[derive(Clone)]
pub struct WalletServerState {
    pub chains: Arc<ConfiguredChains>,
    pub cosigner: Arc<CosignerClient>,
    pub smart_sessions: Arc<SmartSessionConfig>,
    pub payments: Arc<FeasibilityValidator>,
}

pub fn router(state: WalletServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/health", get(health))
        .route("/v1/calls/prepare", post(prepare_calls))
        .route("/v1/calls/send", post(send_prepared_calls))
        .route(
            "/v1/calls/{chain_id}/{user_op_hash}/receipt",
            get(user_op_receipt),
        )
        .route("/v1/checkout/feasible-payments", post(feasible_payments))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct WalletServer {
    handle: Option<JoinHandle<Result<(), std::io::Error>>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    app: Router,
}

impl WalletServer {
    pub fn new(state: WalletServerState) -> Self {
        Self {
            handle: None,
            shutdown_tx: None,
            app: router(state),
        }
    }

    pub fn start(&mut self, listener: tokio::net::TcpListener) -> Result<(), std::io::Error> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = self.app.clone();
        let local_addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            tracing::info!("HTTP server starting on {}", local_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let mut rx = shutdown_rx;
                    while !*rx.borrow() {
                        if rx.changed().await.is_err() {
                            break;
                        }
                    }
                    tracing::info!("HTTP server shutting down");
                })
                .await
        });

        self.handle = Some(handle);
        self.shutdown_tx = Some(shutdown_tx);

        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), std::io::Error> {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(true).is_err() {
                tracing::error!("Failed to send shutdown signal to HTTP server");
            }
        }

        if let Some(handle) = self.handle.take() {
            match handle.await {
                Ok(result) => {
                    if let Err(e) = result {
                        tracing::error!("HTTP server error during shutdown: {}", e);
                        return Err(e);
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to join HTTP server task: {}", e);
                    return Err(std::io::Error::other(format!("Task join error: {}", e)));
                }
            }
        }

        Ok(())
    }
}
