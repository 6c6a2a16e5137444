// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `OpenAPI` document definition

use api_client::{HealthCheckResult, HealthStatus, TokenBalance, TokenRecord};
use shared_types::Network;
use utoipa::OpenApi;

use crate::{
    config::Environment,
    error::ErrorBody,
    orchestrator::ValidationOutcome,
    routes::handlers::{self, BulkTokenRequest, BulkValidationRequest, TokenLookup},
    state::HealthCheck,
};

/// `OpenAPI` document for the gateway
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "SLP Gateway",
        description = "Token queries and SLP transaction validation over SLPDB and a full node. \
                       Every `/v2/slp` route is rate limited per client and route.",
        license(name = "Apache-2.0")
    ),
    paths(
        handlers::health_handler,
        handlers::list_tokens_handler,
        handlers::token_handler,
        handlers::bulk_tokens_handler,
        handlers::balances_for_address_handler,
        handlers::balance_handler,
        handlers::validate_txid_handler,
        handlers::bulk_validate_txids_handler,
    ),
    components(schemas(
        HealthCheck,
        HealthCheckResult,
        HealthStatus,
        Environment,
        Network,
        TokenRecord,
        TokenLookup,
        TokenBalance,
        BulkTokenRequest,
        BulkValidationRequest,
        ValidationOutcome,
        ErrorBody,
    )),
    tags(
        (name = "health", description = "Gateway and upstream health"),
        (name = "tokens", description = "SLP token metadata"),
        (name = "balances", description = "SLP token balances by address"),
        (name = "validation", description = "SLP transaction validation")
    )
)]
pub struct ApiDoc;
