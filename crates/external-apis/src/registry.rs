// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Registry of the upstream clients a gateway instance talks to
//!
//! The gateway needs exactly one transaction validator and one token index.
//! The registry owns both and reports their combined health.

use std::time::Instant;

use api_client::{HealthCheckResult, HealthStatus, Upstream};
use tracing::{debug, warn};

use crate::{NodeRpcClient, SlpdbClient};

/// The upstream clients used by the gateway
#[derive(Debug, Clone)]
pub struct UpstreamRegistry {
    validator: NodeRpcClient,
    index: SlpdbClient,
}

impl UpstreamRegistry {
    /// Create a registry from already-built clients
    pub fn new(validator: NodeRpcClient, index: SlpdbClient) -> Self {
        Self { validator, index }
    }

    /// The per-transaction validator
    pub fn validator(&self) -> &NodeRpcClient {
        &self.validator
    }

    /// The token and balance index
    pub fn index(&self) -> &SlpdbClient {
        &self.index
    }

    /// Get the names of all registered clients
    pub fn client_names(&self) -> [&'static str; 2] {
        [self.validator.name(), self.index.name()]
    }

    /// Probe every upstream
    ///
    /// Health checks are performed concurrently. A probe that errors is
    /// reported as down rather than failing the whole report.
    pub async fn overall_health(&self) -> Vec<HealthCheckResult> {
        let (validator, index) =
            tokio::join!(probe(&self.validator), probe(&self.index));
        vec![validator, index]
    }

    /// Combined status across all upstreams
    pub fn aggregate(results: &[HealthCheckResult]) -> HealthStatus {
        HealthStatus::aggregate(results.iter().map(|r| &r.status))
    }
}

async fn probe<U: Upstream>(client: &U) -> HealthCheckResult {
    let start_time = Instant::now();
    let status = match client.health_check().await {
        Ok(status) => status,
        Err(e) => {
            warn!(upstream = client.name(), error = %e, "health check failed");
            HealthStatus::Down {
                reason: format!("Health check failed: {e}"),
            }
        }
    };
    debug!(upstream = client.name(), ?status, "health probe finished");
    HealthCheckResult::new(client.name(), status, start_time.elapsed())
}
