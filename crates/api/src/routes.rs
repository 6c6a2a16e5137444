// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration and handlers for the SLP gateway.

pub mod handlers;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use handlers::{
    balance_handler, balances_for_address_handler, bulk_tokens_handler,
    bulk_validate_txids_handler, health_handler, list_tokens_handler, token_handler,
    validate_txid_handler,
};

use crate::{
    metrics::metrics_handler,
    middleware::{RateLimiter, rate_limiting_middleware},
    openapi::{openapi_spec, swagger_ui},
    state::ServerState,
};

/// Prefix of every rate limited API route
pub const API_PREFIX: &str = "/v2/slp";

/// Create application routes with conditional rate limiting
pub fn create_routes(rate_limiter: RateLimiter) -> Router<ServerState> {
    // Health and metrics endpoints are not rate limited for monitoring purposes
    let health_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    // Documentation endpoints are not rate limited
    let docs_routes = Router::new()
        .route("/api-doc/openapi.json", get(openapi_spec))
        .route("/swagger-ui", get(swagger_ui));

    let mut slp_routes = Router::new()
        .route("/list", get(list_tokens_handler).post(bulk_tokens_handler))
        .route("/list/{token_id}", get(token_handler))
        .route(
            "/balancesForAddress/{address}",
            get(balances_for_address_handler),
        )
        .route("/balance/{address}/{token_id}", get(balance_handler))
        .route("/validateTxid", post(bulk_validate_txids_handler))
        .route("/validateTxid/{txid}", get(validate_txid_handler));

    // route_layer runs after routing, so the matched path template is known
    if rate_limiter.is_enabled() {
        slp_routes = slp_routes.route_layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limiting_middleware,
        ));
    }

    Router::new()
        .merge(health_routes)
        .merge(docs_routes)
        .nest(API_PREFIX, slp_routes)
}
