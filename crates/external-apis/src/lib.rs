// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream service integrations for the SLP gateway
//!
//! This crate provides the concrete transports behind the `api-client`
//! traits.
//!
//! # Architecture
//!
//! - **Client Implementations**: [`node_rpc`] (JSON-RPC transaction
//!   validator) and [`slpdb`] (token document index)
//! - **Registry**: [`registry::UpstreamRegistry`] owns the clients and
//!   aggregates their health
//! - **Transport plumbing**: [`transport`] classifies `reqwest` failures into
//!   `UpstreamError` and retries transient ones with exponential backoff
//! - **Validation Utilities**: [`non_empty_string::NonEmptyString`] for
//!   required connection settings
//!
//! Every client returns the same discriminated `UpstreamError`, so the server
//! translates failures without knowing which upstream produced them.

pub mod node_rpc;
pub mod non_empty_string;
pub mod registry;
pub mod slpdb;
pub mod transport;

pub use node_rpc::*;
pub use non_empty_string::NonEmptyString;
pub use registry::*;
pub use slpdb::*;
pub use transport::{ClientBuildError, classify_reqwest_error};
