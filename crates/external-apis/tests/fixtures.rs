// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0
#![allow(missing_docs, dead_code)]

//! Upstream test fixtures
//!
//! Canned SLPDB documents, JSON-RPC replies and a wiremock matcher that
//! decodes SLPDB's base64 query path.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use wiremock::{Match, Request};

pub const TXID: &str = "78d57a82a0dd9930cc17843d9d06677f267777dd6b25055bad0ae43f1b884091";
pub const TOKEN_ID: &str = "4de69e374a8ed21cbddd47f2338cc0f479dc58daa2bbe11cd604ca488eca0ddf";
pub const OTHER_TOKEN_ID: &str =
    "c4b0d62156b3fa5c8f3436079b5394f7edc1bef5dc1cd2f9d0c4d46f82cca479";
pub const SLP_ADDRESS: &str = "simpleledger:qz9tzs6d5097ejpg279rg0rnlhz546q4fsnck9wh5m";
/// Address nothing listens on; pooled mock servers keep their ports open
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// JSON-RPC success reply
pub fn rpc_result(result: Value) -> Value {
    json!({ "result": result, "error": null, "id": "test" })
}

/// JSON-RPC error reply, as a node sends it alongside an HTTP 500
pub fn rpc_error(code: i64, message: &str) -> Value {
    json!({ "result": null, "error": { "code": code, "message": message }, "id": "test" })
}

/// One document of the SLPDB `t` collection
pub fn token_document(token_id: &str, symbol: &str) -> Value {
    json!({
        "tokenDetails": {
            "tokenIdHex": token_id,
            "timestamp": "2019-03-14 21:17:27",
            "timestamp_unix": 1_552_598_247,
            "symbol": symbol,
            "name": format!("{symbol} token"),
            "documentUri": "spicetoken.org",
            "documentSha256Hex": null,
            "decimals": 8,
            "genesisOrMintQuantity": { "$numberDecimal": "1000000000" }
        }
    })
}

/// One projected balance document from the SLPDB `a` collection
pub fn balance_document(token_id: &str, balance: &str, decimals: u32) -> Value {
    json!({
        "tokenId": token_id,
        "balance": { "$numberDecimal": balance },
        "slpAddress": SLP_ADDRESS,
        "decimalCount": decimals
    })
}

/// Decode the query document SLPDB received
pub fn decode_query(request: &Request) -> Option<Value> {
    let encoded = request.url.path().strip_prefix("/q/")?;
    let bytes = STANDARD.decode(encoded).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Matches SLPDB queries against a collection, optionally requiring a
/// substring of the decoded query
#[derive(Debug)]
pub struct SlpdbQuery {
    pub collection: &'static str,
    pub contains: Option<String>,
}

impl SlpdbQuery {
    pub fn on(collection: &'static str) -> Self {
        Self {
            collection,
            contains: None,
        }
    }

    pub fn containing(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }
}

impl Match for SlpdbQuery {
    fn matches(&self, request: &Request) -> bool {
        let Some(query) = decode_query(request) else {
            return false;
        };
        let on_collection = query["q"]["db"]
            .as_array()
            .is_some_and(|dbs| dbs.iter().any(|db| db == self.collection));
        let contains = self
            .contains
            .as_ref()
            .is_none_or(|needle| query.to_string().contains(needle.as_str()));
        on_collection && contains
    }
}
