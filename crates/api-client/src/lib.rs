// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream service traits and shared result types
//!
//! The gateway talks to two kinds of upstream service: a per-item transaction
//! validator (a full node speaking JSON-RPC) and a document index holding
//! token metadata and balances. This crate defines the seams between the
//! server and those transports.
//!
//! # Core Abstractions
//!
//! - **`Upstream`**: name and health reporting shared by every client
//! - **`TxValidator`**: validity of a single SLP transaction
//! - **`TokenIndex`**: token records and address balances
//! - **`UpstreamError`**: the single discriminated failure type every client
//!   returns, so error translation has one stable input shape
//!
//! All async operations return `impl Future + Send`, so handlers stay `Send`
//! without boxing.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{TokenId, TxId};
use thiserror::Error;

pub mod health;
pub mod types;

pub use health::*;
pub use types::*;

/// Behaviour shared by every upstream client
pub trait Upstream: Send + Sync {
    /// Short identifier used in logs, metrics labels and health reports
    fn name(&self) -> &'static str;

    /// Check whether the upstream is reachable and answering
    ///
    /// # Errors
    ///
    /// Returns an error if the health probe itself could not be performed
    fn health_check(&self) -> impl Future<Output = Result<HealthStatus, UpstreamError>> + Send;
}

/// Per-item SLP transaction validator
pub trait TxValidator: Upstream {
    /// Ask the validator whether `txid` is a valid SLP transaction
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the transaction is a valid SLP transaction
    /// * `Ok(false)` if it exists but is not valid SLP
    /// * `Err(error)` if the validator failed or rejected the request
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] describing the transport or service failure
    fn validate_txid(&self, txid: &TxId)
    -> impl Future<Output = Result<bool, UpstreamError>> + Send;
}

/// Token metadata and balance index
pub trait TokenIndex: Upstream {
    /// List known tokens, newest first, up to `limit` entries
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] if the index query fails
    fn list_tokens(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TokenRecord>, UpstreamError>> + Send;

    /// Look up a single token by id
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` if the token exists
    /// * `Ok(None)` if the index has no such token
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] if the index query fails
    fn token(
        &self,
        token_id: &TokenId,
    ) -> impl Future<Output = Result<Option<TokenRecord>, UpstreamError>> + Send;

    /// All token balances held by an SLP-encoded address
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] if the index query fails
    fn balances_for_address(
        &self,
        slp_address: &str,
    ) -> impl Future<Output = Result<Vec<TokenBalance>, UpstreamError>> + Send;

    /// Balance of one token held by an SLP-encoded address
    ///
    /// # Errors
    ///
    /// Returns an [`UpstreamError`] if the index query fails
    fn balance(
        &self,
        slp_address: &str,
        token_id: &TokenId,
    ) -> impl Future<Output = Result<Option<TokenBalance>, UpstreamError>> + Send;
}

/// Classification of transport-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    /// The connection was refused or reset
    ConnectionRefused,
    /// The call did not complete within its deadline
    Timeout,
    /// The upstream host name could not be resolved
    Dns,
    /// Any other transport failure
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::Timeout => write!(f, "timeout"),
            Self::Dns => write!(f, "dns"),
            Self::Other => write!(f, "transport"),
        }
    }
}

/// Normalized failure of an upstream call
///
/// Transports map whatever their service returned onto one of these shapes;
/// nothing above the transport layer inspects raw HTTP or RPC errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The service answered with a structured error
    #[error("upstream error ({status}): {message}")]
    Rpc {
        /// HTTP status the service responded with
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// The service could not be reached
    #[error("network error ({kind}): {detail}")]
    Network {
        /// What kind of transport failure occurred
        kind: NetworkErrorKind,
        /// Diagnostic detail for logs
        detail: String,
    },

    /// The service answered with something that could not be interpreted
    #[error("malformed upstream response: {detail}")]
    Malformed {
        /// Diagnostic detail for logs
        detail: String,
    },
}

impl UpstreamError {
    /// Create a structured service error
    pub fn rpc(status: u16, message: impl Into<String>) -> Self {
        Self::Rpc {
            status,
            message: message.into(),
        }
    }

    /// Create a network failure
    pub fn network(kind: NetworkErrorKind, detail: impl Into<String>) -> Self {
        Self::Network {
            kind,
            detail: detail.into(),
        }
    }

    /// Create a timeout failure for a call bounded by `timeout_seconds`
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::network(
            NetworkErrorKind::Timeout,
            format!("request timed out after {timeout_seconds} seconds"),
        )
    }

    /// Create a malformed-response failure
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }

    /// Whether retrying the same call could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Short label for metrics
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Rpc { .. } => "rpc_error",
            Self::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            } => "timeout",
            Self::Network { .. } => "network_error",
            Self::Malformed { .. } => "malformed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_transient() {
        assert!(UpstreamError::timeout(5).is_transient());
        assert!(UpstreamError::network(NetworkErrorKind::Dns, "no such host").is_transient());
        assert!(!UpstreamError::rpc(500, "No such mempool transaction").is_transient());
        assert!(!UpstreamError::malformed("not json").is_transient());
    }

    #[test]
    fn error_display() {
        let err = UpstreamError::rpc(500, "No such mempool transaction");
        assert_eq!(
            err.to_string(),
            "upstream error (500): No such mempool transaction"
        );

        let err = UpstreamError::timeout(3);
        assert_eq!(
            err.to_string(),
            "network error (timeout): request timed out after 3 seconds"
        );
    }

    #[test]
    fn kind_labels() {
        assert_eq!(UpstreamError::timeout(1).kind_label(), "timeout");
        assert_eq!(UpstreamError::rpc(503, "down").kind_label(), "rpc_error");
        assert_eq!(
            UpstreamError::network(NetworkErrorKind::ConnectionRefused, "refused").kind_label(),
            "network_error"
        );
        assert_eq!(UpstreamError::malformed("x").kind_label(), "malformed");
    }
}
