// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! This module provides the per-route rate limiting middleware that runs in
//! front of every `/v2/slp` handler.

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
};

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    config::RateLimitingConfig,
    error::ServerError,
    metrics,
    rate_limit::{Admission, ClientIdentity, RateLimitKey, RateLimitStore, RouteId},
};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Rate limiting middleware state
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitingConfig,
    // Keys are lowercased route ids
    route_overrides: HashMap<String, u32>,
    trusted_clients: HashMap<IpAddr, u32>,
    store: RateLimitStore,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration
    ///
    /// Trusted client entries that are not IP addresses are skipped with a
    /// warning; configuration loading already rejects them.
    pub fn new(config: RateLimitingConfig) -> Self {
        let route_overrides = config
            .route_overrides
            .iter()
            .map(|(route, ceiling)| (route.to_lowercase(), *ceiling))
            .collect();

        let trusted_clients = config
            .trusted_clients
            .iter()
            .filter_map(|(client, ceiling)| match client.parse::<IpAddr>() {
                Ok(ip) => Some((ip, *ceiling)),
                Err(_) => {
                    warn!(client = %client, "ignoring trusted client that is not an IP address");
                    None
                }
            })
            .collect();

        let store = RateLimitStore::new(config.window(), config.max_entries);

        Self {
            config,
            route_overrides,
            trusted_clients,
            store,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// The underlying window store
    pub fn store(&self) -> &RateLimitStore {
        &self.store
    }

    /// Ceiling that applies to `key`
    ///
    /// A trusted client's ceiling wins over a route override, which wins over
    /// the default.
    pub fn ceiling_for(&self, key: &RateLimitKey) -> u32 {
        if let Some(ceiling) = self.trusted_clients.get(&key.client.ip()) {
            return *ceiling;
        }
        self.route_overrides
            .get(&key.route.as_str().to_lowercase())
            .copied()
            .unwrap_or(self.config.requests_per_minute)
    }

    /// Count one request against its window
    pub fn admit(&self, key: RateLimitKey) -> Admission {
        if !self.config.enabled {
            return Admission::Allowed;
        }
        let ceiling = self.ceiling_for(&key);
        self.store.admit(key, ceiling)
    }

    /// Resolve the caller's identity
    ///
    /// Uses the left-most `X-Forwarded-For` entry when forwarded headers are
    /// trusted and parseable, otherwise the socket peer address.
    pub fn client_identity(
        &self,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Option<ClientIdentity> {
        if self.config.trust_forwarded_for {
            let forwarded = headers
                .get(FORWARDED_FOR)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return Some(ClientIdentity::new(ip));
            }
        }
        peer.map(|addr| ClientIdentity::new(addr.ip()))
    }

    /// Message returned with every rejection
    pub fn rejection_message(&self, ceiling: u32) -> String {
        let period = match self.config.window_seconds {
            60 => "minute".to_string(),
            seconds => format!("{seconds} seconds"),
        };
        format!("Too many requests. Limits are {ceiling} requests per {period}.")
    }

    /// Start the background sweep of expired windows
    pub fn spawn_sweeper(&self, cancellation_token: CancellationToken) -> JoinHandle<()> {
        self.store.spawn_sweeper(cancellation_token)
    }
}

/// Rate limiting middleware function
///
/// Must be installed with `route_layer` so the matched path template is
/// available. Rejected requests never reach the handler.
pub async fn rate_limiting_middleware(
    State(rate_limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if !rate_limiter.is_enabled() {
        return next.run(req).await;
    }

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_string(), |p| p.as_str().to_string());
    let route = RouteId::new(req.method().as_str(), &path);

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let Some(client) = rate_limiter.client_identity(req.headers(), peer) else {
        if rate_limiter.config.fail_open {
            debug!(%route, "client identity unknown, admitting");
            return next.run(req).await;
        }
        warn!(%route, "client identity unknown, rejecting");
        metrics::record_rate_limit_decision(route.as_str(), false);
        return ServerError::RateLimited {
            message: "Too many requests. Unable to identify client.".to_string(),
        }
        .into_response();
    };

    let key = RateLimitKey {
        client,
        route: route.clone(),
    };
    let ceiling = rate_limiter.ceiling_for(&key);

    match rate_limiter.admit(key) {
        Admission::Allowed => {
            metrics::record_rate_limit_decision(route.as_str(), true);
            next.run(req).await
        }
        Admission::Rejected { retry_after } => {
            warn!(%client, %route, ceiling, "rate limit exceeded");
            metrics::record_rate_limit_decision(route.as_str(), false);

            let mut response = ServerError::RateLimited {
                message: rate_limiter.rejection_message(ceiling),
            }
            .into_response();
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}
