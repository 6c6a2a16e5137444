// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Token and balance endpoint tests against a mocked SLPDB

mod fixtures;

use fixtures::{
    CASH_ADDRESS, OTHER_TOKEN_ID, SLP_ADDRESS, TESTNET_ADDRESS, TOKEN_ID, Upstreams,
    balance_document, spawn_gateway, test_config, token_document,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio_test::assert_ok;
use wiremock::{Mock, ResponseTemplate, matchers::method};

async fn get_json(url: String) -> (StatusCode, Value) {
    let response = assert_ok!(reqwest::get(url).await);
    let status = response.status();
    (status, assert_ok!(response.json().await))
}

#[tokio::test]
async fn list_returns_reshaped_records() {
    let upstreams = Upstreams::start().await;
    upstreams
        .slpdb_answers(
            "t",
            "tokenDetails",
            json!({ "t": [token_document(TOKEN_ID, "SPICE"), token_document(OTHER_TOKEN_ID, "USDH")] }),
        )
        .await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let (status, body) = get_json(format!("http://{addr}/v2/slp/list")).await;

    assert_eq!(status, StatusCode::OK);
    let tokens = body.as_array().unwrap();
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0]["id"], TOKEN_ID);
    assert_eq!(tokens[0]["symbol"], "SPICE");
    assert_eq!(tokens[0]["decimals"], 8);
    assert_eq!(tokens[0]["initialTokenQty"], 1_000_000_000.0);
    assert_eq!(tokens[1]["symbol"], "USDH");

    token.cancel();
}

#[tokio::test]
async fn token_lookup_is_stable_across_requests() {
    let upstreams = Upstreams::start().await;
    upstreams
        .slpdb_answers("t", TOKEN_ID, json!({ "t": [token_document(TOKEN_ID, "SPICE")] }))
        .await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;
    let url = format!("http://{addr}/v2/slp/list/{TOKEN_ID}");

    let (status, first) = get_json(url.clone()).await;
    let (_, second) = get_json(url).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["id"], TOKEN_ID);
    assert_eq!(first["name"], "SPICE token");
    assert_eq!(first, second);

    token.cancel();
}

#[tokio::test]
async fn unknown_token_returns_not_found_marker() {
    let upstreams = Upstreams::start().await;
    upstreams
        .slpdb_answers("t", OTHER_TOKEN_ID, json!({ "t": [] }))
        .await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let (status, body) = get_json(format!("http://{addr}/v2/slp/list/{OTHER_TOKEN_ID}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": "not found" }));

    token.cancel();
}

#[tokio::test]
async fn invalid_token_id_is_rejected_before_slpdb() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstreams.slpdb)
        .await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let (status, body) = get_json(format!("http://{addr}/v2/slp/list/abc123")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid tokenId: abc123");

    token.cancel();
    upstreams.slpdb.verify().await;
}

#[tokio::test]
async fn bulk_token_lookup_keeps_request_order() {
    let upstreams = Upstreams::start().await;
    upstreams
        .slpdb_answers("t", TOKEN_ID, json!({ "t": [token_document(TOKEN_ID, "SPICE")] }))
        .await;
    upstreams
        .slpdb_answers("t", OTHER_TOKEN_ID, json!({ "t": [] }))
        .await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let response = assert_ok!(
        Client::new()
            .post(format!("http://{addr}/v2/slp/list"))
            .json(&json!({ "tokenIds": [OTHER_TOKEN_ID, TOKEN_ID] }))
            .send()
            .await
    );

    assert_eq!(response.status(), StatusCode::OK);
    let body: Vec<Value> = response.json().await.unwrap();
    assert_eq!(body.len(), 2);
    assert_eq!(body[0], json!({ "id": "not found" }));
    assert_eq!(body[1]["symbol"], "SPICE");

    token.cancel();
}

#[tokio::test]
async fn bulk_token_lookup_requires_an_array() {
    let upstreams = Upstreams::start().await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let response = assert_ok!(
        Client::new()
            .post(format!("http://{addr}/v2/slp/list"))
            .json(&json!({ "tokenIds": TOKEN_ID }))
            .send()
            .await
    );

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "tokenIds needs to be an array");

    token.cancel();
}

#[tokio::test]
async fn balances_accept_cash_addresses() {
    let upstreams = Upstreams::start().await;
    // SLPDB is always queried with the simpleledger form
    upstreams
        .slpdb_answers(
            "a",
            SLP_ADDRESS,
            json!({ "a": [balance_document(TOKEN_ID, "1234.5", 2)] }),
        )
        .await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    for address in [SLP_ADDRESS, CASH_ADDRESS] {
        let (status, body) =
            get_json(format!("http://{addr}/v2/slp/balancesForAddress/{address}")).await;

        assert_eq!(status, StatusCode::OK);
        let balances = body.as_array().unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0]["tokenId"], TOKEN_ID);
        assert_eq!(balances[0]["balance"], 1234.5);
        assert_eq!(balances[0]["balanceString"], "1234.5");
        assert_eq!(balances[0]["slpAddress"], SLP_ADDRESS);
        assert_eq!(balances[0]["decimalCount"], 2);
    }

    token.cancel();
}

#[tokio::test]
async fn missing_balance_is_zero() {
    let upstreams = Upstreams::start().await;
    upstreams
        .slpdb_answers("a", SLP_ADDRESS, json!({ "a": [] }))
        .await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let (status, body) =
        get_json(format!("http://{addr}/v2/slp/balance/{SLP_ADDRESS}/{TOKEN_ID}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tokenId"], TOKEN_ID);
    assert_eq!(body["balance"], 0.0);
    assert_eq!(body["balanceString"], "0");
    assert_eq!(body["slpAddress"], SLP_ADDRESS);

    token.cancel();
}

#[tokio::test]
async fn address_on_the_wrong_network_is_rejected() {
    let upstreams = Upstreams::start().await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let (status, body) =
        get_json(format!("http://{addr}/v2/slp/balancesForAddress/{TESTNET_ADDRESS}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

    let (status, body) =
        get_json(format!("http://{addr}/v2/slp/balancesForAddress/not-an-address")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid address: not-an-address");

    token.cancel();
}

#[tokio::test]
async fn slpdb_outage_is_service_unavailable() {
    let upstreams = Upstreams::start().await;
    let (addr, token) = fixtures::spawn_gateway_at(
        test_config(),
        &upstreams.node.uri(),
        fixtures::UNREACHABLE_URL,
    )
    .await;

    let (status, body) = get_json(format!("http://{addr}/v2/slp/list/{TOKEN_ID}")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().is_some_and(|e| e.starts_with("Network error")));

    token.cancel();
}

#[tokio::test]
async fn bodiless_bulk_token_lookup_names_the_missing_field() {
    let upstreams = Upstreams::start().await;
    let (addr, token) = spawn_gateway(test_config(), &upstreams).await;

    let response = assert_ok!(
        Client::new()
            .post(format!("http://{addr}/v2/slp/list"))
            .send()
            .await
    );

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "tokenIds needs to be an array" }));

    token.cancel();
}
