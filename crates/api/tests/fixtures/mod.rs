// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0
#![allow(missing_docs, dead_code)]

//! Gateway test fixtures
//!
//! Starts a gateway wired to wiremock upstreams so each test controls exactly
//! what the node and SLPDB answer.

use std::{net::SocketAddr, sync::Arc};

use api::{Server, ServerConfig, ShutdownConfig};
use base64::{Engine, engine::general_purpose::STANDARD};
use external_apis::{NodeRpcClient, NodeRpcConfig, SlpdbClient, SlpdbConfig, UpstreamRegistry};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::{
    Match, Mock, MockServer, Request, ResponseTemplate,
    matchers::{body_partial_json, method},
};

pub const TXID: &str = "78d57a82a0dd9930cc17843d9d06677f267777dd6b25055bad0ae43f1b884091";
pub const TOKEN_ID: &str = "4de69e374a8ed21cbddd47f2338cc0f479dc58daa2bbe11cd604ca488eca0ddf";
pub const OTHER_TOKEN_ID: &str =
    "c4b0d62156b3fa5c8f3436079b5394f7edc1bef5dc1cd2f9d0c4d46f82cca479";
pub const SLP_ADDRESS: &str = "simpleledger:qz9tzs6d5097ejpg279rg0rnlhz546q4fsnck9wh5m";
pub const CASH_ADDRESS: &str = "bitcoincash:qz9tzs6d5097ejpg279rg0rnlhz546q4fslra7mh29";
pub const TESTNET_ADDRESS: &str = "slptest:qpm2qsznhks23z7629mms6s4cwef74vcwvmvf54x0u";
pub const UNKNOWN_TX_MESSAGE: &str = "No such mempool or blockchain transaction";

/// Deterministic distinct txids
pub fn txid(n: usize) -> String {
    format!("{n:064x}")
}

/// Mock node and SLPDB servers
#[derive(Debug)]
pub struct Upstreams {
    pub node: MockServer,
    pub slpdb: MockServer,
}

impl Upstreams {
    pub async fn start() -> Self {
        Self {
            node: MockServer::start().await,
            slpdb: MockServer::start().await,
        }
    }

    /// Answer `slpvalidate` for `txid`
    pub async fn node_validates(&self, txid: &str, valid: bool) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "slpvalidate", "params": [txid] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": valid, "error": null, "id": "test"
            })))
            .mount(&self.node)
            .await;
    }

    /// Answer `slpvalidate` for `txid` with a JSON-RPC error
    pub async fn node_rejects(&self, txid: &str, message: &str) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "slpvalidate", "params": [txid] })))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "result": null, "error": { "code": -5, "message": message }, "id": "test"
            })))
            .mount(&self.node)
            .await;
    }

    /// Every `slpvalidate` call must not happen
    pub async fn node_expects_no_validation(&self) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "slpvalidate" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&self.node)
            .await;
    }

    /// Answer SLPDB queries on `collection` that mention `needle`
    pub async fn slpdb_answers(&self, collection: &'static str, needle: &str, body: Value) {
        Mock::given(method("GET"))
            .and(SlpdbQuery {
                collection,
                contains: needle.to_string(),
            })
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.slpdb)
            .await;
    }
}

/// A test configuration with generous rate limits
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::for_testing();
    config.rate_limiting.requests_per_minute = 1_000;
    config
}

/// Address nothing listens on
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

fn registry(node_url: &str, slpdb_url: &str) -> UpstreamRegistry {
    let mut node = NodeRpcConfig::new(node_url, "rpcuser", "rpcpass").unwrap();
    node.timeout_seconds = 2;
    node.health_check_timeout_seconds = 1;
    node.max_retries = 0;

    let mut slpdb = SlpdbConfig::new(slpdb_url).unwrap();
    slpdb.timeout_seconds = 2;
    slpdb.health_check_timeout_seconds = 1;
    slpdb.max_retries = 0;

    UpstreamRegistry::new(
        NodeRpcClient::new(node).unwrap(),
        SlpdbClient::new(slpdb).unwrap(),
    )
}

/// Start a gateway against `upstreams`
pub async fn spawn_gateway(
    config: ServerConfig,
    upstreams: &Upstreams,
) -> (SocketAddr, CancellationToken) {
    spawn_gateway_at(config, &upstreams.node.uri(), &upstreams.slpdb.uri()).await
}

/// Start a gateway against explicit upstream URLs
pub async fn spawn_gateway_at(
    config: ServerConfig,
    node_url: &str,
    slpdb_url: &str,
) -> (SocketAddr, CancellationToken) {
    Server::with_upstreams(
        config,
        ShutdownConfig::default(),
        Arc::new(registry(node_url, slpdb_url)),
    )
    .expect("Failed to create server")
    .run_for_testing()
    .await
    .expect("Failed to start test server")
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

/// Matches SLPDB queries on a collection whose decoded query mentions `contains`
#[derive(Debug)]
pub struct SlpdbQuery {
    pub collection: &'static str,
    pub contains: String,
}

impl Match for SlpdbQuery {
    fn matches(&self, request: &Request) -> bool {
        let Some(query) = request
            .url
            .path()
            .strip_prefix("/q/")
            .and_then(|encoded| STANDARD.decode(encoded).ok())
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        else {
            return false;
        };
        let on_collection = query["q"]["db"]
            .as_array()
            .is_some_and(|dbs| dbs.iter().any(|db| db == self.collection));
        on_collection && query.to_string().contains(self.contains.as_str())
    }
}
