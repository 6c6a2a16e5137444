// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the SLP gateway,
//! including configuration, the upstream clients and coordinated cancellation.

use std::sync::Arc;

use api_client::{HealthCheckResult, HealthStatus};
use external_apis::{NodeRpcClient, UpstreamRegistry};
use serde::Serialize;
use shared_types::Network;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::{
    config::{Environment, ServerConfig},
    orchestrator::BulkValidator,
};

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: Arc<ServerConfig>,
    /// Upstream clients
    upstreams: Arc<UpstreamRegistry>,
    /// Bulk validation orchestrator over the node validator
    bulk_validator: Arc<BulkValidator<NodeRpcClient>>,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `upstreams` - Upstream clients
    /// * `cancellation_token` - Token for coordinated cancellation
    pub fn new(
        config: ServerConfig,
        upstreams: Arc<UpstreamRegistry>,
        cancellation_token: CancellationToken,
    ) -> Self {
        let bulk_validator = Arc::new(BulkValidator::new(
            upstreams.validator().clone(),
            &config.validation,
        ));
        Self {
            config: Arc::new(config),
            upstreams,
            bulk_validator,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Network whose addresses are accepted
    pub fn network(&self) -> Network {
        self.config.network
    }

    /// Upstream clients
    pub fn upstreams(&self) -> &UpstreamRegistry {
        &self.upstreams
    }

    /// Bulk validation orchestrator
    pub fn bulk_validator(&self) -> &BulkValidator<NodeRpcClient> {
        &self.bulk_validator
    }

    /// Probe every upstream and summarize
    pub async fn health_check(&self) -> HealthCheck {
        let upstreams = self.upstreams.overall_health().await;
        let status = UpstreamRegistry::aggregate(&upstreams);

        HealthCheck {
            status,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            environment: self.config.environment,
            network: self.config.network,
            timestamp: chrono::Utc::now().to_rfc3339(),
            upstreams,
        }
    }
}

/// Health check status
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheck {
    /// Gateway status derived from its upstreams
    #[serde(flatten)]
    pub status: HealthStatus,
    /// Service version
    #[schema(value_type = String)]
    pub version: Box<str>,
    /// Environment
    pub environment: Environment,
    /// Served network
    pub network: Network,
    /// Timestamp
    pub timestamp: String,
    /// Status of individual upstreams
    pub upstreams: Vec<HealthCheckResult>,
}
