// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Non-empty string wrapper for upstream connection settings
//!
//! Endpoint URLs, RPC credentials and method names are all required to be
//! present before a client is built. Holding them as [`NonEmptyString`] moves
//! that check to construction time, so a client in hand never sends a request
//! to an empty URL or with a blank method name.
//!
//! ```rust
//! use external_apis::NonEmptyString;
//!
//! let url = NonEmptyString::new("http://127.0.0.1:8332").unwrap();
//! assert_eq!(url.as_str(), "http://127.0.0.1:8332");
//!
//! assert!(NonEmptyString::new("").is_err());
//! assert!(NonEmptyString::new("  \t").is_err());
//! ```

use core::fmt;
use std::str::FromStr;

/// A string with at least one non-whitespace character
///
/// Leading and trailing whitespace is kept as given; only all-blank input is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyString(Box<str>);

impl NonEmptyString {
    /// Wrap `s`, rejecting empty and whitespace-only input
    ///
    /// # Errors
    ///
    /// Returns a descriptive message if `s` has no non-whitespace character
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        if s.trim().is_empty() {
            Err("String cannot be empty or whitespace-only".to_string())
        } else {
            Ok(NonEmptyString(s.into_boxed_str()))
        }
    }

    /// Wrap `s` or report which setting was blank
    ///
    /// # Errors
    ///
    /// Returns `"<field> cannot be empty"` if `s` is blank
    pub fn for_field(field: &str, s: impl Into<String>) -> Result<Self, String> {
        Self::new(s).map_err(|_| format!("{field} cannot be empty"))
    }

    /// Get a string slice of the contained value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NonEmptyString {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_input() {
        assert!(NonEmptyString::new("").is_err());
        assert!(NonEmptyString::new("   ").is_err());
        assert!(NonEmptyString::new("\n\t").is_err());
    }

    #[test]
    fn keeps_surrounding_whitespace() {
        let value = NonEmptyString::new(" slpvalidate ").unwrap();
        assert_eq!(value.as_str(), " slpvalidate ");
        assert_eq!(value.to_string(), " slpvalidate ");
    }

    #[test]
    fn field_error_names_the_setting() {
        let err = NonEmptyString::for_field("node_rpc.url", "").unwrap_err();
        assert_eq!(err, "node_rpc.url cannot be empty");

        let parsed: NonEmptyString = "http://localhost:8332".parse().unwrap();
        assert_eq!(parsed.as_ref(), "http://localhost:8332");
    }
}
