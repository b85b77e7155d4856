//! # Identifiers — Fixed 32-Byte Content Addresses
//!
//! Everything addressable on the Meridian platform — identities, data
//! contracts, documents, asset-lock outpoints — is named by a 32-byte
//! content identifier. The byte string is the canonical identity; the
//! textual forms are projections of it:
//!
//! - **base58** — the canonical human-facing encoding. No ambiguous
//!   characters, URL-safe, and what every explorer and log line shows.
//! - **base64** — used where payload density matters (standard alphabet,
//!   with padding).
//! - **hex** — for debugging and cross-tooling interop.
//!
//! An [`Identifier`] is an immutable value type. It is constructed through
//! validating constructors (length must be exactly 32), compared byte-wise,
//! and never mutated afterward. There is no subclassing of a buffer type
//! here and there never will be.

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::IDENTIFIER_LENGTH;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur constructing or decoding an [`Identifier`].
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// The byte input has the wrong length.
    #[error("invalid identifier length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected number of bytes (always 32).
        expected: usize,
        /// Actual number of bytes provided.
        got: usize,
    },

    /// The textual input could not be decoded in the requested encoding.
    #[error("unable to decode identifier from {encoding}: {reason}")]
    DecodeError {
        /// Which encoding was attempted ("base58", "base64", "hex").
        encoding: &'static str,
        /// Underlying decoder message.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// A 32-byte content identifier.
///
/// Equality, ordering, and hashing are byte-wise. The canonical textual
/// form is base58; [`fmt::Display`] and the human-readable serde
/// representation both use it.
///
/// # Examples
///
/// ```
/// use meridian_protocol::identifier::Identifier;
///
/// let id = Identifier::new([7u8; 32]);
/// let text = id.to_base58();
/// let back = Identifier::from_base58(&text).unwrap();
/// assert_eq!(id, back);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier([u8; IDENTIFIER_LENGTH]);

impl Identifier {
    /// Wrap an exact 32-byte array. Infallible by construction.
    pub const fn new(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Construct from a byte slice, validating the length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let arr: [u8; IDENTIFIER_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| IdentifierError::InvalidLength {
                    expected: IDENTIFIER_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Decode from the canonical base58 text form.
    pub fn from_base58(s: &str) -> Result<Self, IdentifierError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| IdentifierError::DecodeError {
                encoding: "base58",
                reason: e.to_string(),
            })?;
        Self::from_bytes(&bytes)
    }

    /// Decode from standard base64 (with padding).
    pub fn from_base64(s: &str) -> Result<Self, IdentifierError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| IdentifierError::DecodeError {
                encoding: "base64",
                reason: e.to_string(),
            })?;
        Self::from_bytes(&bytes)
    }

    /// Decode from lowercase or uppercase hex.
    pub fn from_hex(s: &str) -> Result<Self, IdentifierError> {
        let bytes = hex::decode(s).map_err(|e| IdentifierError::DecodeError {
            encoding: "hex",
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Encode as base58 — the canonical text form.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Encode as standard base64 with padding.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }

    /// Encode as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Borrow the raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LENGTH] {
        &self.0
    }

    /// Copy out the raw 32 bytes.
    pub fn to_buffer(&self) -> [u8; IDENTIFIER_LENGTH] {
        self.0
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; IDENTIFIER_LENGTH]> for Identifier {
    fn from(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Identifier {
    type Error = IdentifierError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_base58())
    }
}

impl Serialize for Identifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Identifier::from_base58(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            Identifier::from_bytes(&bytes).map_err(serde::de::Error::custom)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
