//! HTTP gateway for the payment orchestration engine.
//!
//! Deliberately thin: routing, DTO mapping, and error-to-status mapping.
//! All business rules live in the orchestrator crate.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Build the router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        // One-time payments
        .route("/payments", post(routes::payments::create))
        .route("/payments/{id}", get(routes::payments::status))
        .route("/payments/{id}/callback", post(routes::payments::callback))
        // Split payments
        .route("/split-payments", post(routes::splits::create))
        .route("/split-payments", get(routes::splits::list))
        .route("/split-payments/{id}", get(routes::splits::status))
        .route("/split-payments/{id}/callback", post(routes::splits::callback))
        .route("/split-payments/{id}/retry", post(routes::splits::retry))
        // Recurring payments
        .route("/recurring-payments", post(routes::recurring::create))
        .route("/recurring-payments", get(routes::recurring::list))
        .route("/recurring-payments/{id}", get(routes::recurring::status))
        .route(
            "/recurring-payments/{id}/callback",
            post(routes::recurring::callback),
        )
        .route(
            "/recurring-payments/{id}/execute",
            post(routes::recurring::execute),
        )
        .route("/recurring-payments/{id}/pause", post(routes::recurring::pause))
        .route(
            "/recurring-payments/{id}/resume",
            post(routes::recurring::resume),
        )
        // Wallet grants and scheduled payments
        .route("/wallet-grants", post(routes::grants::create))
        .route("/wallet-grants/{id}", get(routes::grants::status))
        .route("/wallet-grants/{id}/callback", post(routes::grants::callback))
        .route(
            "/wallet-grants/{id}/payments",
            post(routes::grants::execute_payment),
        )
        .route("/wallet-grants/{id}/schedule", post(routes::grants::schedule))
        .route(
            "/wallet-grants/{id}/scheduled",
            get(routes::grants::list_scheduled),
        )
        // Unified registry
        .route("/operations", get(routes::operations::list))
        .route("/operations/{id}", get(routes::operations::status))
        .route("/operations/{id}", delete(routes::operations::cancel))
        .route("/operations/cleanup", post(routes::operations::cleanup))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    info!("gateway listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
