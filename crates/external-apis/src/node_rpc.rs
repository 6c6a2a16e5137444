// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Full node JSON-RPC integration
//!
//! Implements [`TxValidator`] against a node exposing an SLP validation RPC
//! (`slpvalidate` by default). The node answers each txid with a boolean or a
//! JSON-RPC error such as `"No such mempool or blockchain transaction"`; the
//! error message is carried through unchanged so callers see the node's own
//! explanation.

use std::time::{Duration, Instant};

use api_client::{HealthStatus, TxValidator, Upstream, UpstreamError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared_types::TxId;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    non_empty_string::NonEmptyString,
    transport::{
        ClientBuildError, build_http_client, classify_reqwest_error, validate_base_url,
        with_retries,
    },
};

const DEFAULT_NODE_RPC_TIMEOUT_SECONDS: u64 = 15;
const DEFAULT_NODE_RPC_HEALTH_CHECK_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_NODE_RPC_MAX_RETRIES: u32 = 2;
const DEFAULT_VALIDATE_METHOD: &str = "slpvalidate";
const HEALTH_CHECK_METHOD: &str = "getblockcount";

/// Configuration for the node RPC client
/// This type is always valid by construction.
#[derive(Debug, Clone)]
pub struct NodeRpcConfig {
    /// JSON-RPC endpoint of the full node
    pub url: NonEmptyString,
    /// RPC username
    pub username: String,
    /// RPC password
    pub password: String,
    /// RPC method used to validate a single txid
    pub validate_method: NonEmptyString,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Health check timeout in seconds
    pub health_check_timeout_seconds: u64,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
}

impl NodeRpcConfig {
    /// Create a configuration with default method, timeouts and retries
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is blank
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, String> {
        Ok(Self {
            url: NonEmptyString::for_field("node_rpc.url", url)?,
            username: username.into(),
            password: password.into(),
            validate_method: NonEmptyString::for_field(
                "node_rpc.validate_method",
                DEFAULT_VALIDATE_METHOD,
            )?,
            timeout_seconds: DEFAULT_NODE_RPC_TIMEOUT_SECONDS,
            health_check_timeout_seconds: DEFAULT_NODE_RPC_HEALTH_CHECK_TIMEOUT_SECONDS,
            max_retries: DEFAULT_NODE_RPC_MAX_RETRIES,
        })
    }

    /// Override the validation RPC method name
    ///
    /// # Errors
    ///
    /// Returns an error if `method` is blank
    pub fn with_validate_method(mut self, method: impl Into<String>) -> Result<Self, String> {
        self.validate_method = NonEmptyString::for_field("node_rpc.validate_method", method)?;
        Ok(self)
    }
}

/// JSON-RPC 1.0 request envelope
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: Vec<Value>,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    message: String,
}

/// Full node JSON-RPC client
#[derive(Debug, Clone)]
pub struct NodeRpcClient {
    client: Client,
    config: NodeRpcConfig,
}

impl NodeRpcClient {
    /// Create a new node RPC client
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the HTTP client cannot be
    /// created
    pub fn new(config: NodeRpcConfig) -> Result<Self, ClientBuildError> {
        validate_base_url("node_rpc.url", config.url.as_str())?;
        let client = build_http_client(config.timeout_seconds)?;
        Ok(Self { client, config })
    }

    /// Perform one JSON-RPC call, without retries
    async fn call_once(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout_seconds: u64,
    ) -> Result<Value, UpstreamError> {
        let request_id = Uuid::new_v4();
        let body = RpcRequest {
            jsonrpc: "1.0",
            id: request_id.to_string(),
            method,
            params,
        };

        debug!(%request_id, method, "sending node RPC request");

        let request = self
            .client
            .post(self.config.url.as_str())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&body);

        let response = timeout(Duration::from_secs(timeout_seconds), request.send())
            .await
            .map_err(|_| UpstreamError::timeout(timeout_seconds))?
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| classify_reqwest_error(&e))?;

        parse_rpc_response(status, &text)
    }
}

/// Interpret a JSON-RPC reply
///
/// Nodes report RPC errors with a non-2xx status and a JSON body; a JSON
/// error inside a 2xx reply is treated as a 500.
fn parse_rpc_response(status: StatusCode, text: &str) -> Result<Value, UpstreamError> {
    let status_code = if status.is_success() {
        StatusCode::INTERNAL_SERVER_ERROR.as_u16()
    } else {
        status.as_u16()
    };

    match serde_json::from_str::<RpcResponse>(text) {
        Ok(RpcResponse {
            error: Some(error), ..
        }) => Err(UpstreamError::rpc(status_code, error.message)),
        Ok(RpcResponse {
            result: Some(result),
            ..
        }) if status.is_success() => Ok(result),
        Ok(_) if status.is_success() => Err(UpstreamError::malformed(
            "JSON-RPC reply has neither result nor error",
        )),
        _ if !status.is_success() => Err(UpstreamError::rpc(status_code, text.trim())),
        Ok(_) => Err(UpstreamError::malformed("unexpected JSON-RPC reply")),
        Err(e) => Err(UpstreamError::malformed(format!(
            "invalid JSON-RPC reply: {e}"
        ))),
    }
}

impl Upstream for NodeRpcClient {
    fn name(&self) -> &'static str {
        "node_rpc"
    }

    async fn health_check(&self) -> Result<HealthStatus, UpstreamError> {
        let start_time = Instant::now();
        let result = self
            .call_once(
                HEALTH_CHECK_METHOD,
                Vec::new(),
                self.config.health_check_timeout_seconds,
            )
            .await;
        let response_time = start_time.elapsed();

        match result {
            Ok(_) => {
                info!(?response_time, "node RPC health check passed");
                Ok(HealthStatus::Up)
            }
            Err(UpstreamError::Rpc { status: 401, .. }) => {
                warn!("node RPC health check failed: unauthorized");
                Ok(HealthStatus::Down {
                    reason: "Authentication failed".to_string(),
                })
            }
            Err(e @ UpstreamError::Network { .. }) => {
                warn!(error = %e, "node RPC health check failed");
                Ok(HealthStatus::Down {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                warn!(error = %e, "node RPC health check degraded");
                Ok(HealthStatus::Degraded {
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl TxValidator for NodeRpcClient {
    async fn validate_txid(&self, txid: &TxId) -> Result<bool, UpstreamError> {
        let method = self.config.validate_method.as_str();
        let result = with_retries(self.name(), self.config.max_retries, || {
            self.call_once(
                method,
                vec![json!(txid.as_str())],
                self.config.timeout_seconds,
            )
        })
        .await?;

        match result {
            Value::Bool(valid) => {
                debug!(%txid, valid, "node answered validation request");
                Ok(valid)
            }
            other => Err(UpstreamError::malformed(format!(
                "expected boolean from {method}, got {other}"
            ))),
        }
    }
}
