//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, health, points};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for the deduct/refund endpoints.
/// Generation backends call these on every paid action.
const SPEND_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (user JWT)
/// - `POST /v1/accounts` - Create the caller's account (idempotent)
/// - `GET /v1/accounts/me` - Get current user's account
///
/// ## Points (user JWT)
/// - `GET /v1/points/balance` - Get current balance
/// - `GET /v1/points/transactions` - List transaction history
///
/// ## Points (Service API Key auth, rate-limited)
/// - `POST /v1/points/deduct` - Deduct before a paid action
/// - `POST /v1/points/refund` - Refund after a failed paid action
///
/// ## Admin (JWT of an admin account)
/// - `GET /v1/admin/accounts/:user_id` - Read an account
/// - `GET /v1/admin/accounts/:user_id/transactions` - Read its history
/// - `POST /v1/admin/accounts/:user_id/adjust` - Add or remove points
/// - `POST /v1/admin/accounts/:user_id/plan` - Upgrade to a paid plan
/// - `POST /v1/admin/accounts/:user_id/downgrade` - Return to trial
/// - `POST /v1/admin/accounts/:user_id/disabled` - Enable or disable
/// - `POST /v1/admin/accounts/:user_id/daily-limit` - Set or clear custom limit
/// - `GET|PUT /v1/admin/plan-limits` - Global plan limits
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let spend_routes = Router::new()
        .route("/deduct", post(points::deduct))
        .route("/refund", post(points::refund))
        .layer(ConcurrencyLimitLayer::new(SPEND_MAX_CONCURRENT_REQUESTS));

    let admin_routes = Router::new()
        .route("/accounts/:user_id", get(admin::get_account))
        .route(
            "/accounts/:user_id/transactions",
            get(admin::list_transactions),
        )
        .route("/accounts/:user_id/adjust", post(admin::adjust_balance))
        .route("/accounts/:user_id/plan", post(admin::upgrade_plan))
        .route("/accounts/:user_id/downgrade", post(admin::downgrade))
        .route("/accounts/:user_id/disabled", post(admin::set_disabled))
        .route("/accounts/:user_id/daily-limit", post(admin::set_daily_limit))
        .route(
            "/plan-limits",
            get(admin::get_plan_limits).put(admin::put_plan_limits),
        );

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        // Points
        .route("/points/balance", get(points::get_balance))
        .route("/points/transactions", get(points::list_transactions))
        // Admin
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        // Spend routes (with their own concurrency limit)
        .nest("/points", spend_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
