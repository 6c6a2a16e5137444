// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Token records and balances returned by the document index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Metadata of an SLP token, as served to API clients
///
/// Every field is derived deterministically from the index payload, so two
/// lookups of the same token with no upstream change produce equal records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Token id (txid of the genesis transaction)
    pub id: String,
    /// Genesis block timestamp, if the genesis transaction is confirmed
    pub timestamp: Option<String>,
    /// Ticker symbol
    pub symbol: String,
    /// Human-readable token name
    pub name: String,
    /// Document URI advertised in the genesis transaction
    pub document_uri: String,
    /// Document hash advertised in the genesis transaction
    pub document_hash: Option<String>,
    /// Number of decimal places
    pub decimals: u32,
    /// Quantity minted at genesis, in display units
    pub initial_token_qty: f64,
}

impl TokenRecord {
    /// Render a unix timestamp the way the index clients expect it
    pub fn format_timestamp(unix_seconds: i64) -> Option<String> {
        DateTime::<Utc>::from_timestamp(unix_seconds, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// Balance of one token held by one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    /// Token id
    pub token_id: String,
    /// Balance in display units
    pub balance: f64,
    /// Balance as the exact decimal string reported by the index
    pub balance_string: String,
    /// Holder address in SLP encoding
    pub slp_address: String,
    /// Number of decimal places of the token
    pub decimal_count: u32,
}

impl TokenBalance {
    /// A zero balance for an address that holds none of `token_id`
    pub fn zero(token_id: impl Into<String>, slp_address: impl Into<String>) -> Self {
        Self {
            token_id: token_id.into(),
            balance: 0.0,
            balance_string: "0".to_string(),
            slp_address: slp_address.into(),
            decimal_count: 0,
        }
    }
}
