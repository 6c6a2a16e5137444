// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the SLP gateway
//!
//! This crate provides the domain primitives that are shared across the
//! workspace crates, avoiding circular dependencies between the server and
//! the upstream clients.

pub mod address;
pub mod identifiers;
pub mod network;

pub use address::{AddressError, AddressFormat, CashAddrPrefix, SlpAddress};
pub use identifiers::{IdentifierError, TokenId, TxId};
pub use network::Network;
