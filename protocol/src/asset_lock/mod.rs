//! # Asset Lock Proofs
//!
//! Registering an identity costs credits, and credits are bought by
//! irrevocably locking core-chain funds in a special *asset lock*
//! transaction. An [`AssetLockProof`] is the evidence the platform accepts
//! that such a lock exists:
//!
//! - **Instant** — the funding transaction received an instant lock from
//!   the quorums. Available within seconds; carries the lock, the raw
//!   transaction, and the funded output index.
//! - **Chain** — the funding transaction was mined and the platform's view
//!   of the core chain has caught up to that height. Slower but always
//!   eventually available; carries the confirmed height and the funding
//!   outpoint.
//!
//! Either variant pins down one funding *outpoint* (transaction id + output
//! index), and the identity being registered derives its identifier from
//! that outpoint by double-SHA-256 — so a proof is worth exactly one
//! identity, ever.
//!
//! [`resolver`] races the two confirmation sources and returns whichever
//! proof materializes first.

pub mod resolver;

pub use resolver::{
    AssetLockError, AssetLockProofResolver, TransactionMetadata, WalletAdapter, WalletError,
};

use serde::{Deserialize, Serialize};

use crate::crypto::double_sha256;
use crate::identifier::Identifier;

/// Serialized outpoint length: 32-byte transaction id + 4-byte index.
pub const OUT_POINT_LENGTH: usize = 36;

// ---------------------------------------------------------------------------
// OutPoint
// ---------------------------------------------------------------------------

/// A reference to one output of a core-chain transaction.
///
/// The transaction id is stored in **network order** (the internal byte
/// order of the chain), which is reversed relative to the display-order
/// hashes wallets hand around. Use [`OutPoint::from_wallet_hash`] when the
/// id came from a wallet; downstream consumers of the serialized outpoint
/// expect network order and will silently derive the wrong identity from a
/// byte-flipped id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    /// Transaction id in network byte order.
    pub txid: [u8; 32],

    /// Index of the funded output within the transaction.
    pub output_index: u32,
}

impl OutPoint {
    /// Build from a transaction id already in network order.
    pub fn new(txid: [u8; 32], output_index: u32) -> Self {
        Self { txid, output_index }
    }

    /// Build from a wallet-convention (display-order) transaction hash,
    /// reversing it into network order.
    pub fn from_wallet_hash(tx_hash: &[u8; 32], output_index: u32) -> Self {
        let mut txid = *tx_hash;
        txid.reverse();
        Self { txid, output_index }
    }

    /// Serialize as the canonical 36 bytes: txid followed by the index in
    /// little-endian.
    pub fn to_bytes(&self) -> [u8; OUT_POINT_LENGTH] {
        let mut out = [0u8; OUT_POINT_LENGTH];
        out[..32].copy_from_slice(&self.txid);
        out[32..].copy_from_slice(&self.output_index.to_le_bytes());
        out
    }
}

// ---------------------------------------------------------------------------
// Proof variants
// ---------------------------------------------------------------------------

/// Proof via instant lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantAssetLockProof {
    /// The serialized instant lock, as delivered by the wallet. Opaque to
    /// this layer; the platform verifies it against the active quorums.
    pub instant_lock: Vec<u8>,

    /// The raw funding transaction bytes.
    pub transaction: Vec<u8>,

    /// Index of the asset-lock output within the transaction.
    pub output_index: u32,
}

impl InstantAssetLockProof {
    /// The funding outpoint. The transaction id is the double-SHA-256 of
    /// the raw transaction bytes, which is already network order.
    pub fn out_point(&self) -> OutPoint {
        OutPoint::new(double_sha256(&self.transaction), self.output_index)
    }
}

/// Proof via chain confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAssetLockProof {
    /// Core-chain height the platform has locked, at or past the funding
    /// transaction's block.
    pub core_chain_locked_height: u32,

    /// The funding outpoint, txid in network order.
    pub out_point: OutPoint,
}

/// Evidence that a funding transaction irrevocably backs an identity
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetLockProof {
    /// Confirmed by instant lock.
    Instant(InstantAssetLockProof),
    /// Confirmed by chain height.
    Chain(ChainAssetLockProof),
}

impl AssetLockProof {
    /// The funding outpoint this proof commits to.
    pub fn out_point(&self) -> OutPoint {
        match self {
            Self::Instant(proof) => proof.out_point(),
            Self::Chain(proof) => proof.out_point,
        }
    }

    /// Derive the identifier of the identity this proof funds:
    /// `double_sha256(outpoint bytes)`.
    pub fn create_identifier(&self) -> Identifier {
        Identifier::new(double_sha256(&self.out_point().to_bytes()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
