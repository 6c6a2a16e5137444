// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Transaction and token identifiers
//!
//! Both identifiers are 32-byte hashes rendered as 64 hexadecimal characters.
//! Construction validates the format, so a [`TxId`] or [`TokenId`] in hand is
//! always safe to forward to an upstream service.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

static HEX_256: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[0-9a-fA-F]{64}$").expect("static regex is valid")
});

/// Errors produced when validating a hex identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The identifier was an empty string
    #[error("identifier is empty")]
    Empty,

    /// The identifier is not 64 hexadecimal characters
    #[error("invalid identifier format: {0}")]
    InvalidFormat(String),
}

/// Returns whether `value` is exactly 64 hexadecimal characters
pub fn is_hex_256(value: &str) -> bool {
    HEX_256.is_match(value)
}

fn validate(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if !is_hex_256(value) {
        return Err(IdentifierError::InvalidFormat(value.to_string()));
    }
    Ok(())
}

/// A validated transaction id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TxId(Box<str>);

impl TxId {
    /// Validate and wrap a transaction id
    ///
    /// The original casing is preserved so responses echo exactly what the
    /// caller submitted.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value.into_boxed_str()))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A validated token id (the txid of the token's genesis transaction)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TokenId(Box<str>);

impl TokenId {
    /// Validate and wrap a token id
    pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value.into_boxed_str()))
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TxId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TokenId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
