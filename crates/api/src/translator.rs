// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream failure translation
//!
//! Maps every [`UpstreamError`] onto an HTTP status and a caller-facing
//! message. Structured service errors keep their message so the caller sees
//! the upstream's own explanation; transport failures get a fixed message.

use api_client::UpstreamError;
use axum::http::StatusCode;

/// Message returned when no upstream could be reached
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error: Could not communicate with full node or other external service.";

/// Message returned when the upstream answered with something unusable
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected response from upstream service";

/// An upstream failure in its HTTP form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedError {
    /// Response status, always 5xx
    pub status: StatusCode,
    /// Caller-facing message
    pub message: String,
}

/// Translate an upstream failure
pub fn translate(error: &UpstreamError) -> TranslatedError {
    match error {
        UpstreamError::Rpc { status, message } if !message.trim().is_empty() => {
            let status = StatusCode::from_u16(*status)
                .ok()
                .filter(StatusCode::is_server_error)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            TranslatedError {
                status,
                message: message.clone(),
            }
        }
        UpstreamError::Network { .. } => TranslatedError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: NETWORK_ERROR_MESSAGE.to_string(),
        },
        UpstreamError::Rpc { .. } | UpstreamError::Malformed { .. } => TranslatedError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: UNEXPECTED_RESPONSE_MESSAGE.to_string(),
        },
    }
}
