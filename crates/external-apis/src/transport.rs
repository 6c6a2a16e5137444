// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared HTTP plumbing for the upstream clients
//!
//! Both transports classify `reqwest` failures the same way and retry only
//! transient network failures. A structured error from the service is never
//! retried: asking a node to validate the same unknown txid twice gives the
//! same answer.

use std::{error::Error as StdError, time::Duration};

use api_client::{NetworkErrorKind, UpstreamError};
use reqwest::Client;
use thiserror::Error;
use tokio_retry::{
    RetryIf,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::warn;

const USER_AGENT: &str = concat!("slp-gateway/", env!("CARGO_PKG_VERSION"));
const RETRY_BASE_DELAY_MILLIS: u64 = 100;
const RETRY_MAX_DELAY_SECONDS: u64 = 2;

/// Errors raised while building an upstream client
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// A required setting was missing or malformed
    #[error("invalid upstream configuration: {0}")]
    Config(String),

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build the `reqwest` client used by an upstream transport
pub(crate) fn build_http_client(timeout_seconds: u64) -> Result<Client, ClientBuildError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .build()?)
}

/// Check that `raw` is an absolute http(s) URL
pub(crate) fn validate_base_url(field: &str, raw: &str) -> Result<(), ClientBuildError> {
    let url = url::Url::parse(raw)
        .map_err(|e| ClientBuildError::Config(format!("{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ClientBuildError::Config(format!(
            "{field} must use http or https, got {scheme}"
        ))),
    }
}

/// Map a transport failure onto the normalized upstream error
pub fn classify_reqwest_error(error: &reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        return UpstreamError::network(NetworkErrorKind::Timeout, error.to_string());
    }
    if error.is_decode() {
        return UpstreamError::malformed(error.to_string());
    }
    if error.is_connect() {
        let kind = if mentions_dns(error) {
            NetworkErrorKind::Dns
        } else {
            NetworkErrorKind::ConnectionRefused
        };
        return UpstreamError::network(kind, error.to_string());
    }
    UpstreamError::network(NetworkErrorKind::Other, error.to_string())
}

fn mentions_dns(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        let text = err.to_string().to_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = err.source();
    }
    false
}

/// Run `action` until it succeeds, fails permanently, or retries run out
///
/// `max_retries` counts retries after the first attempt.
pub(crate) async fn with_retries<T, F, Fut>(
    upstream: &'static str,
    max_retries: u32,
    action: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let strategy = ExponentialBackoff::from_millis(RETRY_BASE_DELAY_MILLIS)
        .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECONDS))
        .map(jitter)
        .take(max_retries as usize);

    RetryIf::spawn(strategy, action, |error: &UpstreamError| {
        let transient = error.is_transient();
        if transient {
            warn!(upstream, error = %error, "transient upstream failure, retrying");
        }
        transient
    })
    .await
}
