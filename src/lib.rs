//! Multi-wallet credit ledger service.
//!
//! REST API tracking per-customer balances across named credit pools
//! (shopping credit, birthday credit, loyalty points). Every mutation is
//! recorded as an immutable ledger entry; balances are materialized
//! aggregates updated atomically alongside each entry.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing, resolved to a
//!   merchant (tenant) scope
//! - **Format**: JSON requests/responses
//!
//! The library target exists so integration tests can drive the services
//! against a test database; the binary in `main.rs` wires the same router
//! to a TCP listener.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{db::DbPool, models::wallet::DeductionRule};

/// Shared application state: the connection pool plus the service-level
/// deduction defaults for merchants without a `deduction_rules` row.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub deduction_defaults: DeductionRule,
}

/// Build the HTTP router.
///
/// All `/api/v1` routes sit behind API-key authentication, which resolves
/// the calling merchant and injects it as a request extension. `/health`
/// is public.
pub fn build_router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        // Balance aggregation (read-only)
        .route(
            "/api/v1/credits/balance",
            get(handlers::balance::get_balance),
        )
        // Ledger write paths
        .route("/api/v1/credits/earn", post(handlers::entries::create_earn))
        .route(
            "/api/v1/credits/adjust",
            post(handlers::entries::create_adjustment),
        )
        .route("/api/v1/credits/spend", post(handlers::spend::spend_for_order))
        .route("/api/v1/credits/refund", post(handlers::refund::refund_order))
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state)
}
