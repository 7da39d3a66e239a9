//! Validated identifiers for terminals and clients.
//!
//! Keys are checked once, when they are parsed. Everything downstream holds a
//! key type rather than a bare string, so a malformed key can never reach the
//! registry maps. Both key types order lexicographically, which is the order
//! the registry iterates in.

use std::{borrow::Borrow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Number of ASCII digits in a terminal key.
pub const TERMINAL_KEY_LEN: usize = 6;

/// Terminal identifier: exactly six ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TerminalKey(String);

impl TerminalKey {
    /// Parse and validate a terminal key.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the key is not exactly
    ///   [`TERMINAL_KEY_LEN`] ASCII digits
    pub fn parse(key: &str) -> Result<Self, NetworkError> {
        if key.len() != TERMINAL_KEY_LEN || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NetworkError::InvalidArgument(format!(
                "terminal key must be {TERMINAL_KEY_LEN} ASCII digits, got {key:?}"
            )));
        }

        Ok(Self(key.to_string()))
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Client identifier: any non-blank string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientKey(String);

impl ClientKey {
    /// Parse and validate a client key.
    ///
    /// # Errors
    ///
    /// - `NetworkError::InvalidArgument` if the key is empty or only
    ///   whitespace
    pub fn parse(key: &str) -> Result<Self, NetworkError> {
        if key.trim().is_empty() {
            return Err(NetworkError::InvalidArgument("client key must not be blank".to_string()));
        }

        Ok(Self(key.to_string()))
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_key_traits {
    ($key:ty) => {
        impl fmt::Display for $key {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $key {
            type Err = NetworkError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $key {
            type Error = NetworkError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$key> for String {
            fn from(key: $key) -> Self {
                key.0
            }
        }

        // Lets the registry maps be queried with plain `&str`.
        impl Borrow<str> for $key {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_key_traits!(TerminalKey);
impl_key_traits!(ClientKey);
