// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Bulk transaction validation
//!
//! [`BulkValidator`] checks the whole batch before anything is dispatched,
//! then issues one validator call per txid with bounded concurrency. Results
//! come back in input order. The batch succeeds only if every call succeeded;
//! otherwise the first failure in input order is translated and returned on
//! its own.

use std::time::{Duration, Instant};

use api_client::{TxValidator, UpstreamError};
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{IdentifierError, TxId};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::{
    config::ValidationConfig,
    error::ServerError,
    metrics,
    translator::{TranslatedError, translate},
};

/// Validity of one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationOutcome {
    /// Transaction id as submitted
    pub txid: String,
    /// Whether the transaction is a valid SLP transaction
    pub valid: bool,
}

/// Why a bulk request produced no result array
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkValidationError {
    /// The batch was rejected before dispatch
    #[error("{0}")]
    BadRequest(String),
    /// At least one validator call failed
    #[error("{}", .0.message)]
    Upstream(TranslatedError),
}

impl From<BulkValidationError> for ServerError {
    fn from(error: BulkValidationError) -> Self {
        match error {
            BulkValidationError::BadRequest(message) => ServerError::BadRequest(message),
            BulkValidationError::Upstream(translated) => ServerError::Upstream(translated),
        }
    }
}

/// Extract the array stored under `field`, enforcing emptiness and size rules
///
/// Every element must be a string. The size cap is checked before any
/// per-item rule.
pub fn parse_id_array(
    body: &Value,
    field: &str,
    max_size: usize,
) -> Result<Vec<String>, BulkValidationError> {
    let not_an_array = || BulkValidationError::BadRequest(format!("{field} needs to be an array"));

    let items = body
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(not_an_array)?;

    if items.is_empty() {
        return Err(BulkValidationError::BadRequest(format!(
            "{field} can not be empty"
        )));
    }

    if items.len() > max_size {
        return Err(BulkValidationError::BadRequest(
            "Array too large".to_string(),
        ));
    }

    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(not_an_array))
        .collect()
}

/// Run `call` once per item with at most `max_concurrency` in flight
///
/// Each call is bounded by `call_timeout`; an expired call becomes a timeout
/// network error. Results are returned in input order.
pub async fn fan_out<I, T, F, Fut>(
    items: Vec<I>,
    max_concurrency: usize,
    call_timeout: Duration,
    call: F,
) -> Vec<Result<T, UpstreamError>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    stream::iter(items)
        .map(|item| {
            let pending = call(item);
            async move {
                timeout(call_timeout, pending)
                    .await
                    .unwrap_or_else(|_| Err(UpstreamError::timeout(call_timeout.as_secs())))
            }
        })
        .buffered(max_concurrency.max(1))
        .collect()
        .await
}

/// First failure in input order, or every success
pub fn first_failure<T>(
    results: Vec<Result<T, UpstreamError>>,
) -> Result<Vec<T>, UpstreamError> {
    results.into_iter().collect()
}

/// Fans a txid batch out to a [`TxValidator`]
#[derive(Debug, Clone)]
pub struct BulkValidator<V> {
    validator: V,
    max_bulk_size: usize,
    max_concurrency: usize,
    call_timeout: Duration,
}

impl<V: TxValidator> BulkValidator<V> {
    /// Create an orchestrator around `validator`
    pub fn new(validator: V, config: &ValidationConfig) -> Self {
        Self {
            validator,
            max_bulk_size: config.max_bulk_size,
            max_concurrency: config.max_concurrency,
            call_timeout: config.call_timeout(),
        }
    }

    /// The wrapped validator
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Largest accepted batch
    pub fn max_bulk_size(&self) -> usize {
        self.max_bulk_size
    }

    /// Validate the `txids` array of a request body
    pub async fn validate_body(
        &self,
        body: &Value,
    ) -> Result<Vec<ValidationOutcome>, BulkValidationError> {
        let targets = self.parse_targets(body)?;
        self.validate_targets(targets).await
    }

    /// Check the batch shape and every txid format before dispatch
    pub fn parse_targets(&self, body: &Value) -> Result<Vec<TxId>, BulkValidationError> {
        parse_id_array(body, "txids", self.max_bulk_size)?
            .into_iter()
            .map(|raw| {
                TxId::new(raw.as_str()).map_err(|e| match e {
                    IdentifierError::Empty => {
                        BulkValidationError::BadRequest("Empty txid".to_string())
                    }
                    IdentifierError::InvalidFormat(_) => {
                        BulkValidationError::BadRequest(format!("Invalid txid: {raw}"))
                    }
                })
            })
            .collect()
    }

    /// Validate already checked targets
    pub async fn validate_targets(
        &self,
        targets: Vec<TxId>,
    ) -> Result<Vec<ValidationOutcome>, BulkValidationError> {
        let start_time = Instant::now();
        let size = targets.len();
        let upstream = self.validator.name();

        debug!(size, max_concurrency = self.max_concurrency, "dispatching bulk validation");

        let results = fan_out(
            targets,
            self.max_concurrency,
            self.call_timeout,
            |txid| async move {
                let valid =
                    metrics::timed_upstream_call(upstream, self.validator.validate_txid(&txid))
                        .await?;
                Ok(ValidationOutcome {
                    txid: txid.to_string(),
                    valid,
                })
            },
        )
        .await;

        let elapsed = start_time.elapsed().as_secs_f64();
        match first_failure(results) {
            Ok(outcomes) => {
                metrics::observe_bulk_validation("ok", size, elapsed);
                info!(size, elapsed, "bulk validation finished");
                Ok(outcomes)
            }
            Err(e) => {
                metrics::observe_bulk_validation("upstream_error", size, elapsed);
                warn!(size, error = %e, "bulk validation failed");
                Err(BulkValidationError::Upstream(translate(&e)))
            }
        }
    }
}
