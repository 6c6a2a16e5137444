// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! SLPDB document index integration
//!
//! SLPDB serves MongoDB-style queries over HTTP: the query document is
//! serialized to JSON, base64-encoded and appended to `/q/`. Replies are an
//! envelope keyed by collection (`t` for tokens, `a` for address balances).
//! This module builds those queries and reshapes the replies into
//! [`TokenRecord`] and [`TokenBalance`].

use std::time::{Duration, Instant};

use api_client::{
    HealthStatus, TokenBalance, TokenIndex, TokenRecord, Upstream, UpstreamError,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use shared_types::TokenId;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    non_empty_string::NonEmptyString,
    transport::{
        ClientBuildError, build_http_client, classify_reqwest_error, validate_base_url,
        with_retries,
    },
};

const DEFAULT_SLPDB_TIMEOUT_SECONDS: u64 = 15;
const DEFAULT_SLPDB_HEALTH_CHECK_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_SLPDB_MAX_RETRIES: u32 = 2;
const QUERY_VERSION: u8 = 3;
const BALANCE_QUERY_LIMIT: usize = 10_000;

/// Configuration for the SLPDB client
#[derive(Debug, Clone)]
pub struct SlpdbConfig {
    /// Base URL of the SLPDB HTTP endpoint
    pub base_url: NonEmptyString,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Health check timeout in seconds
    pub health_check_timeout_seconds: u64,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
}

impl SlpdbConfig {
    /// Create a configuration with default timeouts and retries
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is blank
    pub fn new(base_url: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            base_url: NonEmptyString::for_field("slpdb.base_url", base_url)?,
            timeout_seconds: DEFAULT_SLPDB_TIMEOUT_SECONDS,
            health_check_timeout_seconds: DEFAULT_SLPDB_HEALTH_CHECK_TIMEOUT_SECONDS,
            max_retries: DEFAULT_SLPDB_MAX_RETRIES,
        })
    }
}

/// Numeric value as SLPDB emits it
///
/// Token quantities are MongoDB `Decimal128`, which arrive either as a
/// `{"$numberDecimal": "..."}` object, a plain string or a JSON number
/// depending on the SLPDB version.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DecimalValue {
    Wrapped {
        #[serde(rename = "$numberDecimal")]
        number_decimal: String,
    },
    Text(String),
    Number(serde_json::Number),
}

impl DecimalValue {
    fn as_decimal_string(&self) -> String {
        match self {
            Self::Wrapped { number_decimal } | Self::Text(number_decimal) => number_decimal.clone(),
            Self::Number(n) => n.to_string(),
        }
    }

    fn to_f64(&self) -> Result<f64, UpstreamError> {
        let text = self.as_decimal_string();
        text.parse::<f64>()
            .map_err(|_| UpstreamError::malformed(format!("invalid decimal value: {text}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlpdbTokenDetails {
    token_id_hex: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, rename = "timestamp_unix")]
    timestamp_unix: Option<i64>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    document_uri: Option<String>,
    #[serde(default)]
    document_sha256_hex: Option<String>,
    decimals: u32,
    #[serde(default)]
    genesis_or_mint_quantity: Option<DecimalValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlpdbToken {
    token_details: SlpdbTokenDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlpdbBalance {
    token_id: String,
    balance: DecimalValue,
    slp_address: String,
    #[serde(default)]
    decimal_count: Option<u32>,
}

/// Documents returned by a single-collection SLPDB query
#[derive(Debug, Deserialize)]
struct SlpdbEnvelope<T> {
    #[serde(default = "Vec::new", rename = "t", alias = "a")]
    documents: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SlpdbErrorBody {
    error: String,
}

impl SlpdbToken {
    fn into_record(self) -> Result<TokenRecord, UpstreamError> {
        let details = self.token_details;
        let timestamp = details
            .timestamp
            .or_else(|| details.timestamp_unix.and_then(TokenRecord::format_timestamp));
        let initial_token_qty = match details.genesis_or_mint_quantity {
            Some(qty) => qty.to_f64()?,
            None => 0.0,
        };

        Ok(TokenRecord {
            id: details.token_id_hex,
            timestamp,
            symbol: details.symbol.unwrap_or_default(),
            name: details.name.unwrap_or_default(),
            document_uri: details.document_uri.unwrap_or_default(),
            document_hash: details.document_sha256_hex,
            decimals: details.decimals,
            initial_token_qty,
        })
    }
}

impl SlpdbBalance {
    fn into_balance(self) -> Result<TokenBalance, UpstreamError> {
        Ok(TokenBalance {
            balance: self.balance.to_f64()?,
            balance_string: self.balance.as_decimal_string(),
            token_id: self.token_id,
            slp_address: self.slp_address,
            decimal_count: self.decimal_count.unwrap_or(0),
        })
    }
}

/// Encode a query document the way SLPDB expects it in the URL path
pub fn encode_query(query: &Value) -> String {
    STANDARD.encode(query.to_string())
}

fn token_query(find: Value, limit: usize) -> Value {
    json!({
        "v": QUERY_VERSION,
        "q": {
            "db": ["t"],
            "find": find,
            "project": { "tokenDetails": 1, "_id": 0 },
            "sort": { "tokenStats.block_created": -1 },
            "limit": limit
        }
    })
}

fn balance_query(slp_address: &str, token_id: Option<&TokenId>, limit: usize) -> Value {
    let mut filter = json!({
        "address": slp_address,
        "token_balance": { "$gte": 0 }
    });
    if let (Some(id), Some(map)) = (token_id, filter.as_object_mut()) {
        map.insert("tokenDetails.tokenIdHex".to_string(), json!(id.as_str()));
    }

    json!({
        "v": QUERY_VERSION,
        "q": {
            "db": ["a"],
            "aggregate": [
                { "$match": filter },
                { "$lookup": {
                    "from": "tokens",
                    "localField": "tokenDetails.tokenIdHex",
                    "foreignField": "tokenDetails.tokenIdHex",
                    "as": "token"
                }},
                { "$project": {
                    "_id": 0,
                    "tokenId": "$tokenDetails.tokenIdHex",
                    "balance": "$token_balance",
                    "slpAddress": "$address",
                    "decimalCount": { "$arrayElemAt": ["$token.tokenDetails.decimals", 0] }
                }}
            ],
            "limit": limit
        }
    })
}

/// SLPDB HTTP client
#[derive(Debug, Clone)]
pub struct SlpdbClient {
    client: Client,
    config: SlpdbConfig,
}

impl SlpdbClient {
    /// Create a new SLPDB client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or the HTTP client
    /// cannot be created
    pub fn new(config: SlpdbConfig) -> Result<Self, ClientBuildError> {
        validate_base_url("slpdb.base_url", config.base_url.as_str())?;
        let client = build_http_client(config.timeout_seconds)?;
        Ok(Self { client, config })
    }

    fn query_url(&self, query: &Value) -> String {
        format!(
            "{}/q/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            encode_query(query)
        )
    }

    /// Run one query, without retries
    async fn query_once<T: DeserializeOwned>(
        &self,
        query: &Value,
        timeout_seconds: u64,
    ) -> Result<Vec<T>, UpstreamError> {
        let url = self.query_url(query);
        debug!(url, "querying SLPDB");

        let response = timeout(
            Duration::from_secs(timeout_seconds),
            self.client.get(&url).header("accept", "application/json").send(),
        )
        .await
        .map_err(|_| UpstreamError::timeout(timeout_seconds))?
        .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify_reqwest_error(&e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<SlpdbErrorBody>(&text)
                .map_or_else(|_| text.trim().to_string(), |body| body.error);
            warn!(status = status.as_u16(), message, "SLPDB query failed");
            return Err(UpstreamError::rpc(status.as_u16(), message));
        }

        let envelope: SlpdbEnvelope<T> = serde_json::from_str(&text)
            .map_err(|e| UpstreamError::malformed(format!("invalid SLPDB reply: {e}")))?;
        Ok(envelope.documents)
    }

    async fn query<T: DeserializeOwned>(&self, query: &Value) -> Result<Vec<T>, UpstreamError> {
        with_retries(self.name(), self.config.max_retries, || {
            self.query_once(query, self.config.timeout_seconds)
        })
        .await
    }
}

impl Upstream for SlpdbClient {
    fn name(&self) -> &'static str {
        "slpdb"
    }

    async fn health_check(&self) -> Result<HealthStatus, UpstreamError> {
        let start_time = Instant::now();
        let result = self
            .query_once::<Value>(
                &token_query(json!({}), 1),
                self.config.health_check_timeout_seconds,
            )
            .await;
        let response_time = start_time.elapsed();

        match result {
            Ok(_) => {
                info!(?response_time, "SLPDB health check passed");
                Ok(HealthStatus::Up)
            }
            Err(e @ UpstreamError::Network { .. }) => {
                warn!(error = %e, "SLPDB health check failed");
                Ok(HealthStatus::Down {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, "SLPDB health check degraded");
                Ok(HealthStatus::Degraded {
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl TokenIndex for SlpdbClient {
    async fn list_tokens(&self, limit: usize) -> Result<Vec<TokenRecord>, UpstreamError> {
        let tokens: Vec<SlpdbToken> = self.query(&token_query(json!({}), limit)).await?;
        tokens.into_iter().map(SlpdbToken::into_record).collect()
    }

    async fn token(&self, token_id: &TokenId) -> Result<Option<TokenRecord>, UpstreamError> {
        let find = json!({ "tokenDetails.tokenIdHex": token_id.as_str() });
        let tokens: Vec<SlpdbToken> = self.query(&token_query(find, 1)).await?;
        tokens.into_iter().next().map(SlpdbToken::into_record).transpose()
    }

    async fn balances_for_address(
        &self,
        slp_address: &str,
    ) -> Result<Vec<TokenBalance>, UpstreamError> {
        let query = balance_query(slp_address, None, BALANCE_QUERY_LIMIT);
        let balances: Vec<SlpdbBalance> = self.query(&query).await?;
        balances.into_iter().map(SlpdbBalance::into_balance).collect()
    }

    async fn balance(
        &self,
        slp_address: &str,
        token_id: &TokenId,
    ) -> Result<Option<TokenBalance>, UpstreamError> {
        let query = balance_query(slp_address, Some(token_id), 1);
        let balances: Vec<SlpdbBalance> = self.query(&query).await?;
        balances
            .into_iter()
            .next()
            .map(SlpdbBalance::into_balance)
            .transpose()
    }
}
