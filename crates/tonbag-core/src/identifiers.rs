//! Identifiers for content items, providers and wallet owners.
//!
//! Content and provider keys share one textual format: 32 bytes rendered as
//! 64 hexadecimal characters. Input is accepted in either case and
//! normalized to lower case so that equality is byte equality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TonbagError;

/// Length in characters of a hex-encoded 32-byte key.
pub const HEX_KEY_LEN: usize = 64;

fn normalize_hex_key(raw: &str, what: &str) -> Result<String, TonbagError> {
    let trimmed = raw.trim();
    if trimmed.len() != HEX_KEY_LEN {
        return Err(TonbagError::invalid(format!(
            "{what} must be {HEX_KEY_LEN} hex characters, got {}",
            trimmed.len()
        )));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TonbagError::invalid(format!(
            "{what} must contain only hex characters"
        )));
    }
    Ok(trimmed.to_ascii_lowercase())
}

macro_rules! hex_key {
    ($name:ident, $what:literal) => {
        impl $name {
            /// Parse and normalize a hex key.
            pub fn parse(raw: &str) -> Result<Self, TonbagError> {
                normalize_hex_key(raw, $what).map(Self)
            }

            /// Build a key from raw bytes.
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(hex::encode(bytes))
            }

            /// The normalized lower-case hex form.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Shortened form for log lines and labels.
            pub fn short(&self) -> &str {
                &self.0[..8]
            }
        }

        impl FromStr for $name {
            type Err = TonbagError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TonbagError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// Hash identifying one content item (bag).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentKey(String);

hex_key!(ContentKey, "content key");

/// Public key identifying a storage provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderKey(String);

hex_key!(ProviderKey, "provider key");

/// Wallet address that authorizes contract operations for a content item.
///
/// The address format belongs to the wallet collaborator; only emptiness is
/// checked here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerAddress(String);

impl OwnerAddress {
    /// Parse an owner address, rejecting blank input.
    pub fn parse(raw: &str) -> Result<Self, TonbagError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TonbagError::invalid("owner address is empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The address as given by the wallet.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `EQAb...xyz9` style abbreviation used in labels.
    pub fn abbreviated(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return self.0.clone();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl TryFrom<String> for OwnerAddress {
    type Error = TonbagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerAddress> for String {
    fn from(value: OwnerAddress) -> Self {
        value.0
    }
}

impl fmt::Display for OwnerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The (content item, authorizing address) pair that bounds which providers,
/// cache namespace and poll cycle are currently valid.
///
/// Two scopes are equal only if both halves are equal, so binding or
/// unbinding a wallet is a scope change just like selecting another bag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentScope {
    /// Selected content item
    pub content_key: ContentKey,
    /// Bound wallet address, if any
    pub owner: Option<OwnerAddress>,
}

impl ContentScope {
    /// Scope for a content item with no wallet bound.
    pub fn unbound(content_key: ContentKey) -> Self {
        Self {
            content_key,
            owner: None,
        }
    }

    /// Scope for a content item with a bound wallet.
    pub fn bound(content_key: ContentKey, owner: OwnerAddress) -> Self {
        Self {
            content_key,
            owner: Some(owner),
        }
    }

    /// Whether a wallet is bound, i.e. whether polling should run.
    pub fn is_authorized(&self) -> bool {
        self.owner.is_some()
    }
}

impl fmt::Display for ContentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}@{}", self.content_key.short(), owner.abbreviated()),
            None => write!(f, "{}@unbound", self.content_key.short()),
        }
    }
}
