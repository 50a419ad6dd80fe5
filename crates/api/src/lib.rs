//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes over [`LedgerService`]
//! - Error-to-response mapping
//! - Request tracing and request ids

pub mod error;
pub mod routes;

use axum::Router;
use paystore_core::ledger::LedgerService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger command service.
    pub service: LedgerService,
}

impl AppState {
    /// Creates the application state.
    #[must_use]
    pub const fn new(service: LedgerService) -> Self {
        Self { service }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(routes::not_found)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
