// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Thin per-endpoint handlers: validate the input, make the upstream call and
//! reshape the result. Input errors are returned before any upstream call;
//! upstream failures are translated at the call site.

use api_client::{TokenBalance, TokenIndex, TokenRecord, TxValidator, Upstream, UpstreamError};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    error::{ErrorBody, ServerError, ServerResult},
    extractors::JsonExtractor,
    metrics::timed_upstream_call,
    orchestrator::{ValidationOutcome, fan_out, first_failure, parse_id_array},
    state::{HealthCheck, ServerState},
    translator::translate,
    validators::{index_address, require_address, require_token_id, require_txid},
};

/// Maximum number of token records returned by the list endpoint
pub const TOKEN_LIST_LIMIT: usize = 10_000;

/// Marker returned in place of a token record that does not exist
pub const NOT_FOUND: &str = "not found";

/// A token record, or the not-found marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum TokenLookup {
    /// The token exists
    Found(TokenRecord),
    /// No token has this id
    NotFound {
        /// Always `"not found"`
        id: String,
    },
}

impl From<Option<TokenRecord>> for TokenLookup {
    fn from(record: Option<TokenRecord>) -> Self {
        record.map_or_else(
            || Self::NotFound {
                id: NOT_FOUND.to_string(),
            },
            Self::Found,
        )
    }
}

/// Bulk token lookup request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkTokenRequest {
    /// Token ids to look up
    pub token_ids: Vec<String>,
}

/// Bulk transaction validation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkValidationRequest {
    /// Transaction ids to validate
    pub txids: Vec<String>,
}

/// Await an upstream call, recording its duration and translating failures
async fn upstream_call<U: Upstream, T>(
    upstream: &U,
    call: impl Future<Output = Result<T, UpstreamError>>,
) -> ServerResult<T> {
    timed_upstream_call(upstream.name(), call)
        .await
        .map_err(|e| ServerError::Upstream(translate(&e)))
}

/// Health check endpoint handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check endpoint",
    description = "Returns the gateway version, environment and network together with the probed status of the node RPC and SLPDB upstreams.",
    responses(
        (status = 200, description = "Gateway is running", body = HealthCheck)
    )
)]
pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthCheck> {
    Json(state.health_check().await)
}

/// List token records
#[utoipa::path(
    get,
    path = "/v2/slp/list",
    tag = "tokens",
    summary = "List SLP tokens",
    responses(
        (status = 200, description = "Token records", body = Vec<TokenRecord>),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 503, description = "Upstream unavailable", body = ErrorBody)
    )
)]
pub async fn list_tokens_handler(
    State(state): State<ServerState>,
) -> ServerResult<Json<Vec<TokenRecord>>> {
    let index = state.upstreams().index();
    let tokens = upstream_call(index, index.list_tokens(TOKEN_LIST_LIMIT)).await?;
    debug!(count = tokens.len(), "listed tokens");
    Ok(Json(tokens))
}

/// Look up one token
#[utoipa::path(
    get,
    path = "/v2/slp/list/{token_id}",
    tag = "tokens",
    summary = "Token details",
    description = "Returns the token record, or `{\"id\": \"not found\"}` with status 200 when the index has no such token.",
    params(("token_id" = String, Path, description = "64 hex character token id")),
    responses(
        (status = 200, description = "Token record or not-found marker", body = TokenLookup),
        (status = 400, description = "Invalid token id", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 503, description = "Upstream unavailable", body = ErrorBody)
    )
)]
pub async fn token_handler(
    State(state): State<ServerState>,
    Path(token_id): Path<String>,
) -> ServerResult<Json<TokenLookup>> {
    let token_id = require_token_id(&token_id)?;
    let index = state.upstreams().index();
    let record = upstream_call(index, index.token(&token_id)).await?;
    Ok(Json(record.into()))
}

/// Look up several tokens
#[utoipa::path(
    post,
    path = "/v2/slp/list",
    tag = "tokens",
    summary = "Bulk token details",
    request_body = BulkTokenRequest,
    responses(
        (status = 200, description = "One entry per token id, in request order", body = Vec<TokenLookup>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 503, description = "Upstream unavailable", body = ErrorBody)
    )
)]
pub async fn bulk_tokens_handler(
    State(state): State<ServerState>,
    JsonExtractor(body): JsonExtractor,
) -> ServerResult<Json<Vec<TokenLookup>>> {
    let settings = &state.config().validation;
    let token_ids = parse_id_array(&body, "tokenIds", settings.max_bulk_size)?
        .iter()
        .map(String::as_str)
        .map(require_token_id)
        .collect::<ServerResult<Vec<_>>>()?;

    let index = state.upstreams().index();
    let results = fan_out(
        token_ids,
        settings.max_concurrency,
        settings.call_timeout(),
        |token_id| async move { timed_upstream_call(index.name(), index.token(&token_id)).await },
    )
    .await;

    let records = first_failure(results).map_err(|e| ServerError::Upstream(translate(&e)))?;
    Ok(Json(records.into_iter().map(TokenLookup::from).collect()))
}

/// Token balances held by an address
#[utoipa::path(
    get,
    path = "/v2/slp/balancesForAddress/{address}",
    tag = "balances",
    summary = "All token balances of an address",
    params(("address" = String, Path, description = "SLP or cash address")),
    responses(
        (status = 200, description = "Balances", body = Vec<TokenBalance>),
        (status = 400, description = "Invalid address", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 503, description = "Upstream unavailable", body = ErrorBody)
    )
)]
pub async fn balances_for_address_handler(
    State(state): State<ServerState>,
    Path(address): Path<String>,
) -> ServerResult<Json<Vec<TokenBalance>>> {
    let address = require_address(&address, state.network())?;
    let slp_address = index_address(&address)?;

    let index = state.upstreams().index();
    let balances = upstream_call(index, index.balances_for_address(&slp_address)).await?;
    Ok(Json(balances))
}

/// Balance of one token held by an address
#[utoipa::path(
    get,
    path = "/v2/slp/balance/{address}/{token_id}",
    tag = "balances",
    summary = "Single token balance of an address",
    description = "Returns a zero balance when the address holds none of the token.",
    params(
        ("address" = String, Path, description = "SLP or cash address"),
        ("token_id" = String, Path, description = "64 hex character token id")
    ),
    responses(
        (status = 200, description = "Balance", body = TokenBalance),
        (status = 400, description = "Invalid address or token id", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 503, description = "Upstream unavailable", body = ErrorBody)
    )
)]
pub async fn balance_handler(
    State(state): State<ServerState>,
    Path((address, token_id)): Path<(String, String)>,
) -> ServerResult<Json<TokenBalance>> {
    let address = require_address(&address, state.network())?;
    let token_id = require_token_id(&token_id)?;
    let slp_address = index_address(&address)?;

    let index = state.upstreams().index();
    let balance = upstream_call(index, index.balance(&slp_address, &token_id))
        .await?
        .unwrap_or_else(|| TokenBalance::zero(token_id.as_str(), slp_address));
    Ok(Json(balance))
}

/// Validate one transaction
#[utoipa::path(
    get,
    path = "/v2/slp/validateTxid/{txid}",
    tag = "validation",
    summary = "Validate an SLP transaction",
    params(("txid" = String, Path, description = "64 hex character transaction id")),
    responses(
        (status = 200, description = "Validation result", body = ValidationOutcome),
        (status = 400, description = "Invalid txid", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Node rejected the request", body = ErrorBody),
        (status = 503, description = "Node unavailable", body = ErrorBody)
    )
)]
pub async fn validate_txid_handler(
    State(state): State<ServerState>,
    Path(txid): Path<String>,
) -> ServerResult<Json<ValidationOutcome>> {
    let txid = require_txid(&txid)?;
    let validator = state.upstreams().validator();
    let valid = upstream_call(validator, validator.validate_txid(&txid)).await?;

    Ok(Json(ValidationOutcome {
        txid: txid.to_string(),
        valid,
    }))
}

/// Validate several transactions
#[utoipa::path(
    post,
    path = "/v2/slp/validateTxid",
    tag = "validation",
    summary = "Validate SLP transactions in bulk",
    description = "Validates every txid concurrently. Either all results are returned, in request order, or a single error describing the first failing txid.",
    request_body = BulkValidationRequest,
    responses(
        (status = 200, description = "One result per txid, in request order", body = Vec<ValidationOutcome>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Node rejected a txid", body = ErrorBody),
        (status = 503, description = "Node unavailable", body = ErrorBody)
    )
)]
pub async fn bulk_validate_txids_handler(
    State(state): State<ServerState>,
    JsonExtractor(body): JsonExtractor,
) -> ServerResult<Json<Vec<ValidationOutcome>>> {
    let outcomes = state.bulk_validator().validate_body(&body).await?;
    info!(count = outcomes.len(), "validated txids");
    Ok(Json(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_serializes_as_marker() {
        let json = serde_json::to_value(TokenLookup::from(None)).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "not found" }));
    }

    #[test]
    fn found_token_serializes_flat() {
        let record = TokenRecord {
            id: "a".repeat(64),
            timestamp: None,
            symbol: "TEST".to_string(),
            name: "Test Token".to_string(),
            document_uri: String::new(),
            document_hash: None,
            decimals: 2,
            initial_token_qty: 1000.0,
        };
        let json = serde_json::to_value(TokenLookup::from(Some(record))).unwrap();
        assert_eq!(json["symbol"], "TEST");
        assert_eq!(json["initialTokenQty"], 1000.0);
    }
}
