// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Address parsing and network detection
//!
//! Addresses arrive either in cashaddr form (`bitcoincash:`, `simpleledger:`,
//! and their test/regtest counterparts, with or without the prefix) or as
//! legacy base58 strings. Parsing determines which network the address
//! belongs to so handlers can reject cross-network requests before calling
//! any upstream service.
//!
//! Cashaddr checksums are verified. For unprefixed cashaddr bodies the
//! network is found by checking the checksum against every known prefix.
//! Legacy addresses are classified by their version character only.

use std::{fmt, str::FromStr};

use crate::Network;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LEN: usize = 8;
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Errors produced while parsing an address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The address string was empty
    #[error("address is empty")]
    Empty,

    /// The prefix is not a known cashaddr prefix
    #[error("unknown address prefix: {0}")]
    UnknownPrefix(String),

    /// The address could not be decoded
    #[error("invalid address: {0}")]
    Invalid(String),

    /// The cashaddr checksum does not match
    #[error("invalid address checksum: {0}")]
    BadChecksum(String),

    /// Conversion is only available for cashaddr-encoded addresses
    #[error("legacy addresses are not supported for this operation: {0}")]
    LegacyUnsupported(String),
}

/// Known cashaddr prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CashAddrPrefix {
    /// `bitcoincash:` mainnet
    BitcoinCash,
    /// `simpleledger:` mainnet, SLP-aware
    SimpleLedger,
    /// `bchtest:` testnet
    BchTest,
    /// `slptest:` testnet, SLP-aware
    SlpTest,
    /// `bchreg:` regtest
    BchReg,
    /// `slpreg:` regtest, SLP-aware
    SlpReg,
}

impl CashAddrPrefix {
    const ALL: [Self; 6] = [
        Self::BitcoinCash,
        Self::SimpleLedger,
        Self::BchTest,
        Self::SlpTest,
        Self::BchReg,
        Self::SlpReg,
    ];

    /// Returns the prefix string without the trailing colon
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BitcoinCash => "bitcoincash",
            Self::SimpleLedger => "simpleledger",
            Self::BchTest => "bchtest",
            Self::SlpTest => "slptest",
            Self::BchReg => "bchreg",
            Self::SlpReg => "slpreg",
        }
    }

    /// Returns the network this prefix belongs to
    pub const fn network(self) -> Network {
        match self {
            Self::BitcoinCash | Self::SimpleLedger => Network::Mainnet,
            Self::BchTest | Self::SlpTest | Self::BchReg | Self::SlpReg => Network::Testnet,
        }
    }

    /// Returns the SLP-aware prefix on the same network
    pub const fn slp(self) -> Self {
        match self {
            Self::BitcoinCash | Self::SimpleLedger => Self::SimpleLedger,
            Self::BchTest | Self::SlpTest => Self::SlpTest,
            Self::BchReg | Self::SlpReg => Self::SlpReg,
        }
    }

    /// Returns the plain cash prefix on the same network
    pub const fn cash(self) -> Self {
        match self {
            Self::BitcoinCash | Self::SimpleLedger => Self::BitcoinCash,
            Self::BchTest | Self::SlpTest => Self::BchTest,
            Self::BchReg | Self::SlpReg => Self::BchReg,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == prefix)
    }
}

/// Encoding family of a parsed address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressFormat {
    /// Cashaddr with its prefix and 5-bit payload (checksum excluded)
    CashAddr {
        /// Prefix the address was written with, or the one whose checksum matched
        prefix: CashAddrPrefix,
        /// 5-bit payload groups
        payload: Vec<u8>,
    },
    /// Legacy base58 address
    Legacy,
}

/// A parsed address with its detected network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlpAddress {
    original: Box<str>,
    network: Network,
    format: AddressFormat,
}

impl SlpAddress {
    /// Parse an address in any supported encoding
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Some((prefix, body)) = input.split_once(':') {
            let lowered = prefix.to_lowercase();
            let prefix = CashAddrPrefix::from_prefix(&lowered)
                .ok_or_else(|| AddressError::UnknownPrefix(prefix.to_string()))?;
            let payload = decode_body(body, input)?;
            if !verify_checksum(prefix, &payload) {
                return Err(AddressError::BadChecksum(input.to_string()));
            }
            return Ok(Self::cashaddr(input, prefix, payload));
        }

        if is_legacy_candidate(input) {
            return Self::legacy(input);
        }

        let payload = decode_body(input, input)?;
        let prefix = CashAddrPrefix::ALL
            .into_iter()
            .find(|prefix| verify_checksum(*prefix, &payload))
            .ok_or_else(|| AddressError::BadChecksum(input.to_string()))?;
        Ok(Self::cashaddr(input, prefix, payload))
    }

    fn cashaddr(input: &str, prefix: CashAddrPrefix, mut payload: Vec<u8>) -> Self {
        payload.truncate(payload.len() - CHECKSUM_LEN);
        Self {
            original: Box::from(input),
            network: prefix.network(),
            format: AddressFormat::CashAddr { prefix, payload },
        }
    }

    fn legacy(input: &str) -> Result<Self, AddressError> {
        let network = match input.as_bytes().first() {
            Some(b'1' | b'3') => Network::Mainnet,
            Some(b'm' | b'n' | b'2') => Network::Testnet,
            _ => return Err(AddressError::Invalid(input.to_string())),
        };
        Ok(Self {
            original: Box::from(input),
            network,
            format: AddressFormat::Legacy,
        })
    }

    /// Network the address belongs to
    pub fn network(&self) -> Network {
        self.network
    }

    /// Encoding the address was submitted in
    pub fn format(&self) -> &AddressFormat {
        &self.format
    }

    /// The address exactly as it was submitted
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Returns whether the address belongs to `network`
    pub fn is_on(&self, network: Network) -> bool {
        self.network == network
    }

    /// Re-encode as an SLP-aware cashaddr (`simpleledger:` / `slptest:` / `slpreg:`)
    pub fn to_slp(&self) -> Result<String, AddressError> {
        self.encode_with(CashAddrPrefix::slp)
    }

    /// Re-encode as a plain cashaddr (`bitcoincash:` / `bchtest:` / `bchreg:`)
    pub fn to_cash(&self) -> Result<String, AddressError> {
        self.encode_with(CashAddrPrefix::cash)
    }

    fn encode_with(
        &self,
        select: fn(CashAddrPrefix) -> CashAddrPrefix,
    ) -> Result<String, AddressError> {
        match &self.format {
            AddressFormat::CashAddr { prefix, payload } => Ok(encode(select(*prefix), payload)),
            AddressFormat::Legacy => Err(AddressError::LegacyUnsupported(
                self.original.to_string(),
            )),
        }
    }
}

impl FromStr for SlpAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SlpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn is_legacy_candidate(input: &str) -> bool {
    (26..=35).contains(&input.len())
        && matches!(input.as_bytes().first(), Some(b'1' | b'3' | b'm' | b'n' | b'2'))
        && input.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// Decode a cashaddr body into 5-bit groups, checksum included
fn decode_body(body: &str, input: &str) -> Result<Vec<u8>, AddressError> {
    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    if body.len() <= CHECKSUM_LEN || (has_lower && has_upper) {
        return Err(AddressError::Invalid(input.to_string()));
    }

    body.bytes()
        .map(|b| {
            let b = b.to_ascii_lowercase();
            CHARSET
                .iter()
                .position(|&c| c == b)
                .and_then(|pos| u8::try_from(pos).ok())
                .ok_or_else(|| AddressError::Invalid(input.to_string()))
        })
        .collect()
}

fn expand_prefix(prefix: CashAddrPrefix) -> impl Iterator<Item = u8> {
    prefix
        .as_str()
        .bytes()
        .map(|b| b & 0x1f)
        .chain(std::iter::once(0))
}

fn polymod(values: impl Iterator<Item = u8>) -> u64 {
    let mut c: u64 = 1;
    for d in values {
        let c0 = c >> 35;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        if c0 & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae_2eab_e2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e_4f43_e470;
        }
    }
    c ^ 1
}

fn verify_checksum(prefix: CashAddrPrefix, payload_with_checksum: &[u8]) -> bool {
    polymod(expand_prefix(prefix).chain(payload_with_checksum.iter().copied())) == 0
}

fn encode(prefix: CashAddrPrefix, payload: &[u8]) -> String {
    let checksum = polymod(
        expand_prefix(prefix)
            .chain(payload.iter().copied())
            .chain(std::iter::repeat_n(0, CHECKSUM_LEN)),
    );

    let mut out = String::with_capacity(prefix.as_str().len() + 1 + payload.len() + CHECKSUM_LEN);
    out.push_str(prefix.as_str());
    out.push(':');
    for &group in payload {
        out.push(char::from(CHARSET[usize::from(group)]));
    }
    for i in 0..CHECKSUM_LEN {
        let group = (checksum >> (5 * (CHECKSUM_LEN - 1 - i))) & 0x1f;
        #[allow(clippy::cast_possible_truncation)]
        out.push(char::from(CHARSET[group as usize]));
    }
    out
}
