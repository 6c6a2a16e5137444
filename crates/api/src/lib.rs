// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! SLP Gateway Server Implementation
//!
//! This crate provides the HTTP server for the SLP gateway, built with Axum.
//! It admits requests per client and route, validates inputs, queries SLPDB and a
//! full node, and reshapes their answers into a stable JSON contract.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`error`]: Error types and HTTP response handling with proper status codes
//! - [`translator`]: Mapping of upstream failures onto HTTP status codes and messages
//! - [`validators`]: Input guards for addresses, token ids and txids
//! - [`rate_limit`]: Bounded in-memory admission windows keyed by client and route
//! - [`middleware`]: The rate limiting middleware built on [`rate_limit`]
//! - [`orchestrator`]: Bounded-concurrency bulk txid validation
//! - [`state`]: Shared application state management with cancellation token support
//! - [`server`]: Main server implementation, lifecycle, and coordinated shutdown
//! - [`routes`]: Route configuration and HTTP request handlers
//! - [`metrics`]: Prometheus metrics and the `/metrics` handler
//! - [`docs`]: The `OpenAPI` document derived from the handlers
//! - [`openapi`]: `OpenAPI` specification and Swagger UI endpoints for API documentation
//! - [`extractors`]: JSON body extraction with descriptive rejections
//!
//! # Key Features
//!
//! - **Bulk Validation**: All-or-nothing batches with ordered results and one aggregated error
//! - **Graceful Shutdown**: Coordinated termination using `CancellationToken` with timeouts
//! - **Rate Limiting**: Per client and route ceilings with overrides and trusted clients
//! - **Health Monitoring**: Aggregated health checks across the node and SLPDB
//! - **Production Safety**: Validates credentials and limits at startup

pub mod config;
pub mod docs;
pub mod error;
pub mod extractors;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod orchestrator;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod state;
pub mod translator;
pub mod validators;

pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use orchestrator::{BulkValidationError, BulkValidator, ValidationOutcome};
pub use server::{Server, ShutdownConfig};
pub use shared_types::Network;
pub use state::{HealthCheck, ServerState};
