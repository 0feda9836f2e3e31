//! HTTP gateway
//!
//! Thin axum surface over the transfer executor and the ledger read side.

pub mod handlers;
pub mod state;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
pub use state::AppState;

/// Build the gateway router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/transfer", post(handlers::create_transfer))
        .route("/api/v1/transactions", get(handlers::list_transactions))
        .route(
            "/api/v1/transactions/{transaction_id}",
            get(handlers::get_transaction),
        )
        .route(
            "/api/v1/accounts/{account_id}/transactions",
            get(handlers::get_account_transactions),
        )
        .route("/api/v1/health", get(handlers::health_check))
        .with_state(state)
}

/// Serve until `shutdown` resolves; in-flight requests finish first
pub async fn run_server<F>(
    state: Arc<AppState>,
    config: &GatewayConfig,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, "Gateway listening");
    println!("🚀 Gateway listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Gateway server error")?;

    tracing::info!("Gateway stopped");
    Ok(())
}
