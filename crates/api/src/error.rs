// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! This module provides the error types for server operations and their HTTP
//! response mapping. Every error response body has the shape
//! `{ "error": "<message>" }`.

use std::net::SocketAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::translator::TranslatedError;

/// Error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Caller input rejected before any upstream call
    #[error("{0}")]
    BadRequest(String),

    /// JSON parsing errors with detailed context
    #[error("Invalid JSON request: {message}")]
    JsonError {
        /// Detailed error message
        message: String,
    },

    /// Upstream failure already translated to its HTTP form
    #[error("{}", .0.message)]
    Upstream(TranslatedError),

    /// Request rejected by the rate limiter
    #[error("{message}")]
    RateLimited {
        /// Message naming the applicable limit
        message: String,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message
    pub error: String,
}

impl ServerError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Config { .. }
            | ServerError::Bind { .. }
            | ServerError::Startup { .. }
            | ServerError::Shutdown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::BadRequest(_) | ServerError::JsonError { .. } => StatusCode::BAD_REQUEST,
            ServerError::Upstream(translated) => translated.status,
            ServerError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<TranslatedError> for ServerError {
    fn from(translated: TranslatedError) -> Self {
        Self::Upstream(translated)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
