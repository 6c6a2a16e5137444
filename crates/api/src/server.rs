// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct and implementation for the SLP gateway,
//! including server lifecycle management, router configuration, and coordinated graceful
//! shutdown using `CancellationToken`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, http::HeaderName};
use external_apis::{NodeRpcClient, SlpdbClient, UpstreamRegistry};
use hyper::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    middleware::RateLimiter,
    routes::create_routes,
    state::ServerState,
};

// Server constants
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for graceful shutdown before forcing termination
    pub graceful_timeout: Duration,
    /// Maximum time to wait for all tasks to complete after graceful shutdown
    pub force_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
            force_timeout: Duration::from_secs(DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Server state
    state: ServerState,
    /// Admission control shared with the router
    rate_limiter: RateLimiter,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    graceful_shutdown_config: ShutdownConfig,
}

impl Server {
    /// Create new server instance
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid or an
    /// upstream client cannot be built.
    pub fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        let upstreams = Self::create_upstreams_from_config(&config)?;
        Self::with_upstreams(config, shutdown_config, Arc::new(upstreams))
    }

    /// Create the upstream clients from server configuration
    fn create_upstreams_from_config(config: &ServerConfig) -> ServerResult<UpstreamRegistry> {
        let config_error = |message: String| ServerError::Config { message };

        let node_config = config.upstreams.node_rpc_config().map_err(config_error)?;
        let validator = NodeRpcClient::new(node_config)
            .map_err(|e| config_error(format!("failed to create node RPC client: {e}")))?;

        let slpdb_config = config.upstreams.slpdb_config().map_err(config_error)?;
        let index = SlpdbClient::new(slpdb_config)
            .map_err(|e| config_error(format!("failed to create SLPDB client: {e}")))?;

        Ok(UpstreamRegistry::new(validator, index))
    }

    /// Create server with custom upstream clients for dependency injection
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn with_upstreams(
        config: ServerConfig,
        graceful_shutdown_config: ShutdownConfig,
        upstreams: Arc<UpstreamRegistry>,
    ) -> ServerResult<Self> {
        config.validate().map_err(|e| ServerError::Config {
            message: e.to_string(),
        })?;

        let cancellation_token = CancellationToken::new();
        let state = ServerState::new(
            config.clone(),
            upstreams,
            cancellation_token.child_token(),
        );
        let rate_limiter = RateLimiter::new(config.rate_limiting.clone());
        let router = Self::create_router(state.clone(), rate_limiter.clone());

        Ok(Self {
            config,
            router,
            state,
            rate_limiter,
            cancellation_token,
            graceful_shutdown_config,
        })
    }

    /// Create application router with middleware
    fn create_router(state: ServerState, rate_limiter: RateLimiter) -> Router {
        let timeout_duration = state.config().timeout_seconds.value();

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id, method = %req.method(), uri = %req.uri())
                    } else {
                        tracing::error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown")
                    }
                }),
            )
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(timeout_duration));

        create_routes(rate_limiter)
            .layer(middleware)
            .with_state(state)
    }

    /// Run the server with coordinated graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// or `ServerError::Startup` if the server fails to start.
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        info!(
            address = %actual_addr,
            environment = %self.config.environment,
            network = %self.config.network,
            "SLP gateway starting",
        );

        let sweeper = self
            .rate_limiter
            .is_enabled()
            .then(|| self.rate_limiter.spawn_sweeper(self.cancellation_token.child_token()));

        let cancellation_token = self.cancellation_token.clone();
        let shutdown_token = cancellation_token.clone();
        tokio::spawn(async move {
            info!("spawning the graceful shutdown task");
            Self::shutdown_signal_handler(shutdown_token).await;
        });

        let graceful_timeout = self.graceful_shutdown_config.graceful_timeout;
        let force_timeout = self.graceful_shutdown_config.force_timeout;
        let serve = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            info!("SLP gateway draining connections");
        })
        .into_future();

        let drain_token = self.cancellation_token.clone();
        let drain_deadline = async move {
            drain_token.cancelled().await;
            tokio::time::sleep(graceful_timeout).await;
        };

        let result = tokio::select! {
            server_result = serve => {
                match server_result {
                    Ok(()) => {
                        info!("SLP gateway shut down gracefully");
                        Ok(())
                    }
                    Err(e) => {
                        error!(error = ?e, "Server error during shutdown");
                        Err(ServerError::Shutdown { source: e })
                    }
                }
            }
            () = drain_deadline => {
                warn!(?graceful_timeout, "graceful shutdown timed out, dropping open connections");
                Ok(())
            }
        };

        // Background tasks observe the same token; give them a bounded window to exit
        self.cancellation_token.cancel();
        if let Some(sweeper) = sweeper
            && tokio::time::timeout(force_timeout, sweeper).await.is_err()
        {
            warn!(?force_timeout, "rate limit sweeper did not stop in time");
        }

        result
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// This function listens for SIGINT (Ctrl+C) and SIGTERM signals,
    /// and cancels the provided cancellation token when received.
    ///
    /// # Arguments
    ///
    /// * `cancellation_token` - Token to cancel when shutdown signal is received
    async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
        let signal_received = async {
            #[cfg(unix)]
            #[allow(clippy::expect_used)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => {
                        warn!("Received SIGTERM signal, initiating coordinated shutdown");
                        "SIGTERM"
                    },
                    _ = sigint.recv() => {
                        warn!("Received SIGINT signal, initiating coordinated shutdown");
                        "SIGINT"
                    },
                }
            }

            #[cfg(not(unix))]
            #[allow(clippy::expect_used)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install CTRL+C signal handler");
                warn!("Received CTRL+C signal, initiating coordinated shutdown");
                "CTRL+C"
            }
        };

        // Wait for either a signal or existing cancellation
        tokio::select! {
            signal_name = signal_received => {
                warn!("Shutdown signal {} received, cancelling all operations...", signal_name);
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                warn!("Cancellation token already cancelled, shutdown signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Run server for testing, returns the bound address
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn run_for_testing(self) -> ServerResult<(SocketAddr, CancellationToken)> {
        let addr = self.config.socket_addr();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        let token = self.cancellation_token.child_token();
        let task = token.child_token();
        if self.rate_limiter.is_enabled() {
            self.rate_limiter.spawn_sweeper(token.child_token());
        }
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                self.router
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { task.cancelled().await })
            .await;
        });

        Ok((actual_addr, token))
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Get the rate limiter shared with the router
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}
