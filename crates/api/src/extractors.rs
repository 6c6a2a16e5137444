// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Custom extractors for improved error handling
//!
//! This module provides custom extractors that offer better error messages
//! than the default Axum extractors, particularly for JSON parsing failures.
//!
//! Bulk endpoints check the shape of their body themselves, so the extractor
//! yields an untyped [`Value`] and reads an empty body as `{}`.

use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use crate::error::ServerError;

mod error_hints {
    pub const MISSING_COMMA: &str =
        "check for missing or extra commas between object properties or array elements";
    pub const MISSING_BRACE: &str = "check for missing closing brace '}' for JSON object";
    pub const MISSING_BRACKET: &str = "check for missing closing bracket ']' for JSON array";
    pub const MISSING_QUOTES: &str =
        "check for missing or improperly escaped quotes around string values";
    pub const CONTROL_CHARS: &str = "JSON contains invalid control characters that must be escaped";
    pub const EXPECTED_VALUE: &str =
        "expected a valid JSON value (string, number, boolean, null, object, or array)";
    pub const DEFAULT_SYNTAX: &str = "check JSON formatting and structure";
    pub const TRUNCATED_JSON: &str =
        "unexpected end of JSON input, request appears to be truncated";
}

const MAX_JSON_PAYLOAD_SIZE: usize = 1024 * 1024; // 1MB limit

/// Custom JSON extractor that provides detailed error messages for parsing failures
#[derive(Debug)]
pub struct JsonExtractor(pub Value);

impl<S> FromRequest<S> for JsonExtractor
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Self::extract_json(req, state).await
    }
}

impl JsonExtractor {
    async fn extract_json<S>(req: Request, state: &S) -> Result<Self, ServerError>
    where
        S: Send + Sync,
    {
        // Validate content-type if present
        if let Some(content_type) = req.headers().get("content-type")
            && let Ok(content_type_str) = content_type.to_str()
            && !content_type_str.starts_with("application/json")
        {
            return Err(ServerError::JsonError {
                message: format!(
                    "invalid content-type: expected 'application/json', got '{content_type_str}'"
                ),
            });
        }

        let bytes = match axum::body::Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(rejection) => {
                return Err(ServerError::JsonError {
                    message: format!("failed to read request body: {rejection}"),
                });
            }
        };

        if bytes.len() > MAX_JSON_PAYLOAD_SIZE {
            return Err(ServerError::JsonError {
                message: format!(
                    "request body too large: {} bytes (max: {} bytes)",
                    bytes.len(),
                    MAX_JSON_PAYLOAD_SIZE
                ),
            });
        }

        // A missing body is an object without fields
        if bytes.is_empty() {
            return Ok(JsonExtractor(Value::Object(Map::new())));
        }

        serde_json::from_slice::<Value>(&bytes)
            .map(JsonExtractor)
            .map_err(|err| ServerError::JsonError {
                message: describe_json_error(&err),
            })
    }
}

impl IntoResponse for JsonExtractor {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

fn describe_json_error(err: &serde_json::Error) -> String {
    if err.is_syntax() {
        format!(
            "invalid JSON syntax at line {}, column {}: {}",
            err.line(),
            err.column(),
            get_json_syntax_hint(err)
        )
    } else if err.is_eof() {
        error_hints::TRUNCATED_JSON.to_string()
    } else {
        format!("JSON parsing error: {err}")
    }
}

/// Provides helpful hints for JSON syntax errors
fn get_json_syntax_hint(err: &serde_json::Error) -> &'static str {
    let err_msg = err.to_string();

    if err_msg.contains("expected ','") || err_msg.contains("trailing comma") {
        error_hints::MISSING_COMMA
    } else if err_msg.contains("expected '}'") {
        error_hints::MISSING_BRACE
    } else if err_msg.contains("expected ']'") {
        error_hints::MISSING_BRACKET
    } else if err_msg.contains("expected '\"'") {
        error_hints::MISSING_QUOTES
    } else if err_msg.contains("control character") {
        error_hints::CONTROL_CHARS
    } else if err_msg.contains("expected value") {
        error_hints::EXPECTED_VALUE
    } else {
        error_hints::DEFAULT_SYNTAX
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{HeaderValue, Method},
    };
    use serde_json::json;

    use super::*;

    fn create_request(body: &str) -> Request {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/v2/slp/validateTxid")
            .body(Body::from(body.to_string()))
            .unwrap();

        req.headers_mut()
            .insert("content-type", HeaderValue::from_static("application/json"));

        req
    }

    async fn rejection_message(req: Request) -> String {
        match JsonExtractor::from_request(req, &()).await {
            Err(ServerError::JsonError { message }) => message,
            Err(other) => format!("unexpected error: {other}"),
            Ok(_) => "unexpected success".to_string(),
        }
    }

    #[tokio::test]
    async fn valid_json_parsing() {
        let req = create_request(r#"{"txids": ["abc"]}"#);
        let JsonExtractor(data) = JsonExtractor::from_request(req, &()).await.unwrap();
        assert_eq!(data, json!({ "txids": ["abc"] }));
    }

    #[tokio::test]
    async fn empty_body_is_empty_object() {
        let JsonExtractor(data) = JsonExtractor::from_request(create_request(""), &())
            .await
            .unwrap();
        assert_eq!(data, json!({}));
    }

    #[tokio::test]
    async fn truncated_body_error() {
        let message = rejection_message(create_request(r#"{"txids": ["abc""#)).await;
        assert!(
            message.contains("unexpected end of JSON input")
                || message.contains("invalid JSON syntax"),
            "{message}"
        );
    }

    #[tokio::test]
    async fn syntax_error_with_comma() {
        let message = rejection_message(create_request(r#"{"txids": ["a",, "b"]}"#)).await;
        assert!(message.contains("invalid JSON syntax"), "{message}");
        assert!(message.contains("line"));
    }

    #[tokio::test]
    async fn wrong_shape_is_left_to_the_handler() {
        let req = create_request(r#"{"txids": "abc"}"#);
        let JsonExtractor(data) = JsonExtractor::from_request(req, &()).await.unwrap();
        assert_eq!(data["txids"], "abc");
    }

    #[tokio::test]
    async fn wrong_content_type() {
        let mut req = create_request(r#"{"txids": []}"#);
        req.headers_mut()
            .insert("content-type", HeaderValue::from_static("text/plain"));
        let message = rejection_message(req).await;
        assert!(message.contains("invalid content-type"));
    }

    #[tokio::test]
    async fn missing_content_type_is_accepted() {
        let mut req = create_request(r#"{"txids": []}"#);
        req.headers_mut().remove("content-type");
        let result = JsonExtractor::from_request(req, &()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let body = format!(r#"{{"txids": ["{}"]}}"#, "a".repeat(MAX_JSON_PAYLOAD_SIZE));
        let message = rejection_message(create_request(&body)).await;
        assert!(message.contains("request body too large"));
    }
}
