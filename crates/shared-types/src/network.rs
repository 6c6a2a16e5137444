// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Blockchain network identifiers
//!
//! The gateway serves exactly one network per deployment. Every address that
//! reaches a route handler is checked against the configured network before
//! any upstream call is made.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Network a gateway deployment serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin Cash mainnet
    Mainnet,
    /// Bitcoin Cash testnet (regtest addresses are treated as testnet)
    Testnet,
}

impl Network {
    /// Returns the human-readable name of the network
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// Returns whether this is the main network
    pub const fn is_mainnet(self) -> bool {
        matches!(self, Self::Mainnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            _ => Err(NetworkParseError(s.to_string())),
        }
    }
}

/// Error type for network name parsing
#[derive(Debug, thiserror::Error)]
#[error("unsupported network: {0}. Supported networks are: mainnet, testnet")]
pub struct NetworkParseError(String);
