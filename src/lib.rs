//! Append-only hash-chained heartbeat ledger served over HTTP.
//!
//! Clients read the whole chain with `GET /` and submit measurements with
//! `POST /`; each accepted measurement is wrapped in a block that links to its
//! predecessor by SHA-256 hash. The chain lives only in process memory.

pub mod chain;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod routes;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::ledger::LedgerStore;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerStore>,
}

impl AppState {
    pub fn new(ledger: LedgerStore) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

/// Routes only, without transport middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::get_chain).post(routes::write_block))
        .route("/validate", get(routes::validate))
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .with_state(state)
}

/// Wrap a router with request tracing, the request timeout and the body cap.
pub fn apply_middleware(router: Router, config: &Config) -> Router {
    router
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
