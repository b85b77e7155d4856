//! # Identities & Signature Verification
//!
//! The client's read-side view of a platform identity: an identifier, a
//! balance, a revision, and the set of public keys the identity can sign
//! with. Key generation and signing live in the wallet — this layer only
//! ever *verifies*, and it does so through the [`SignatureVerifier`] trait
//! so the crypto backend stays swappable at the seam.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::Identifier;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Signature scheme of an identity public key.
///
/// Ed25519 is the only scheme the platform currently accepts. The enum
/// exists so a future scheme lands as a variant, not a refactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    /// Ed25519 as implemented by `ed25519-dalek`. 32-byte public keys,
    /// 64-byte signatures.
    Ed25519,
}

/// One public key attached to an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityPublicKey {
    /// Key id, unique within the identity. Signatures reference this.
    pub id: u64,

    /// The signature scheme this key uses.
    pub key_type: KeyType,

    /// Raw public key bytes (32 for Ed25519).
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A platform identity, as fetched from the state repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Content identifier of the identity.
    pub id: Identifier,

    /// Public keys the identity can currently sign with.
    pub public_keys: Vec<IdentityPublicKey>,

    /// Credit balance, in the platform's smallest unit.
    pub balance: u64,

    /// Identity revision, bumped on every identity update.
    pub revision: u64,
}

impl Identity {
    /// Look up a public key by its id.
    pub fn public_key_by_id(&self, key_id: u64) -> Option<&IdentityPublicKey> {
        self.public_keys.iter().find(|k| k.id == key_id)
    }
}

// ---------------------------------------------------------------------------
// SignatureVerifier
// ---------------------------------------------------------------------------

/// Errors from signature verification.
#[derive(Debug, Error)]
pub enum SignatureVerificationError {
    /// The public key bytes cannot be interpreted under the declared scheme.
    #[error("malformed public key: {reason}")]
    MalformedPublicKey {
        /// Why the key was rejected.
        reason: String,
    },

    /// The signature bytes have the wrong shape for the declared scheme.
    #[error("malformed signature: expected {expected} bytes, got {got}")]
    MalformedSignature {
        /// Expected signature length.
        expected: usize,
        /// Actual length provided.
        got: usize,
    },

    /// The signature is well-formed but does not verify over the message.
    #[error("signature does not verify")]
    VerificationFailed,
}

/// Capability to verify a signature against an identity public key.
///
/// The batch validator holds one of these; the default implementation is
/// [`Ed25519SignatureVerifier`]. Wallet-side *signing* is deliberately not
/// part of this trait — constructing a signature requires key material this
/// layer never touches.
pub trait SignatureVerifier: Send + Sync {
    /// Verify `signature` over `message` with `public_key`.
    fn verify(
        &self,
        message: &[u8],
        public_key: &IdentityPublicKey,
        signature: &[u8],
    ) -> Result<(), SignatureVerificationError>;
}

/// The stock Ed25519 verifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519SignatureVerifier;

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify(
        &self,
        message: &[u8],
        public_key: &IdentityPublicKey,
        signature: &[u8],
    ) -> Result<(), SignatureVerificationError> {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let KeyType::Ed25519 = public_key.key_type;

        let key_bytes: [u8; 32] = public_key.data.as_slice().try_into().map_err(|_| {
            SignatureVerificationError::MalformedPublicKey {
                reason: format!("expected 32 bytes, got {}", public_key.data.len()),
            }
        })?;
        let verifying_key = VerifyingKey::from_bytes(&key_bytes).map_err(|e| {
            SignatureVerificationError::MalformedPublicKey {
                reason: e.to_string(),
            }
        })?;

        let signature = Signature::from_slice(signature).map_err(|_| {
            SignatureVerificationError::MalformedSignature {
                expected: crate::config::SIGNATURE_LENGTH,
                got: signature.len(),
            }
        })?;

        verifying_key
            .verify(message, &signature)
            .map_err(|_| SignatureVerificationError::VerificationFailed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
