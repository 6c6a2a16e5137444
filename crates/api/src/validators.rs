// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Request input guards
//!
//! Synchronous checks that run before any upstream call. Each guard returns
//! the validated value or a [`ServerError::BadRequest`] naming the field.

use shared_types::{AddressError, IdentifierError, Network, SlpAddress, TokenId, TxId};

use crate::error::{ServerError, ServerResult};

/// Message for an address that belongs to the other network
pub const WRONG_NETWORK_MESSAGE: &str =
    "Invalid network. Trying to use a testnet address on mainnet, or vice versa.";

/// Validate a transaction id path or body value
pub fn require_txid(raw: &str) -> ServerResult<TxId> {
    TxId::new(raw).map_err(|e| match e {
        IdentifierError::Empty => ServerError::BadRequest("txid can not be empty".to_string()),
        IdentifierError::InvalidFormat(_) => ServerError::BadRequest(format!("Invalid txid: {raw}")),
    })
}

/// Validate a token id
pub fn require_token_id(raw: &str) -> ServerResult<TokenId> {
    TokenId::new(raw).map_err(|e| match e {
        IdentifierError::Empty => ServerError::BadRequest("tokenId can not be empty".to_string()),
        IdentifierError::InvalidFormat(_) => {
            ServerError::BadRequest(format!("Invalid tokenId: {raw}"))
        }
    })
}

/// Validate an address and check it belongs to the served network
pub fn require_address(raw: &str, network: Network) -> ServerResult<SlpAddress> {
    let address = SlpAddress::parse(raw).map_err(|e| match e {
        AddressError::Empty => ServerError::BadRequest("address can not be empty".to_string()),
        _ => ServerError::BadRequest(format!("Invalid address: {raw}")),
    })?;

    if !address.is_on(network) {
        return Err(ServerError::BadRequest(WRONG_NETWORK_MESSAGE.to_string()));
    }

    Ok(address)
}

/// The form of an address the token index stores balances under
pub fn index_address(address: &SlpAddress) -> ServerResult<String> {
    address
        .to_slp()
        .map_err(|_| ServerError::BadRequest(format!("Invalid address: {}", address.as_str())))
}
