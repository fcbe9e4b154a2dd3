//! Axum-based RPC server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use credscore_engine::CreditService;
use tower_http::trace::TraceLayer;

use crate::error::RpcError;
use crate::handlers;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CreditService>,
}

/// Build the router with all endpoints.
pub fn router(service: Arc<CreditService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/records", post(handlers::create_record))
        .route("/records/:owner", get(handlers::get_score))
        .route("/records/:owner/last-change", get(handlers::get_last_change))
        .route("/tokens/:token/transfer", post(handlers::transfer))
        .route("/approvals", post(handlers::grant_approval))
        .route("/approvals/revoke", post(handlers::revoke_approval))
        .route("/approvals/:owner", get(handlers::list_approvals))
        .route("/approvals/:owner/:integration", get(handlers::is_approved))
        .route("/scores/:token/adjust", post(handlers::adjust_score))
        .route(
            "/locks/:token",
            get(handlers::lock_status)
                .post(handlers::lock)
                .delete(handlers::unlock),
        )
        .route("/treasury/withdraw", post(handlers::withdraw))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

pub struct RpcServer {
    pub addr: SocketAddr,
    service: Arc<CreditService>,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, service: Arc<CreditService>) -> Self {
        Self { addr, service }
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        let local = listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))?;
        tracing::info!(addr = %local, "RPC server listening");

        axum::serve(listener, router(self.service))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        tracing::info!("RPC server stopped");
        Ok(())
    }
}
