// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Health check types for upstream clients

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health status of an upstream service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum HealthStatus {
    /// Service is healthy and operational
    Up,
    /// Service is degraded but still functional
    Degraded { reason: String },
    /// Service is down and not functional
    Down { reason: String },
}

/// Result of probing one upstream, with timing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResult {
    /// Upstream name
    pub upstream: String,
    /// The health status
    #[serde(flatten)]
    pub status: HealthStatus,
    /// Probe duration in milliseconds
    pub response_time_ms: u64,
    /// When the probe was performed
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    /// Check if this health status indicates the service is available
    pub fn is_available(&self) -> bool {
        matches!(self, HealthStatus::Up | HealthStatus::Degraded { .. })
    }

    /// Check if this health status indicates the service is completely down
    pub fn is_down(&self) -> bool {
        matches!(self, HealthStatus::Down { .. })
    }

    /// Get a human-readable description of the status
    pub fn description(&self) -> &str {
        match self {
            HealthStatus::Up => "Service is healthy",
            HealthStatus::Degraded { reason } | HealthStatus::Down { reason } => reason,
        }
    }

    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Up => 0,
            HealthStatus::Degraded { .. } => 1,
            HealthStatus::Down { .. } => 2,
        }
    }

    /// Combine the statuses of several upstreams into the gateway's status
    ///
    /// Any upstream down makes the gateway degraded rather than down: the
    /// routes served by the remaining upstream keep working.
    pub fn aggregate<'a>(statuses: impl IntoIterator<Item = &'a HealthStatus>) -> HealthStatus {
        let worst = statuses.into_iter().max_by_key(|s| s.severity());
        match worst {
            None | Some(HealthStatus::Up) => HealthStatus::Up,
            Some(status) => HealthStatus::Degraded {
                reason: status.description().to_string(),
            },
        }
    }
}

impl HealthCheckResult {
    /// Create a result for `upstream` probed in `response_time`
    pub fn new(upstream: impl Into<String>, status: HealthStatus, response_time: Duration) -> Self {
        Self {
            upstream: upstream.into(),
            status,
            response_time_ms: u64::try_from(response_time.as_millis()).unwrap_or(u64::MAX),
            timestamp: Utc::now(),
        }
    }
}
