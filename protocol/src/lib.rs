// Copyright (c) 2026 Meridian Labs. MIT License.
// See LICENSE for details.

//! # Meridian Protocol — Client-Side Core
//!
//! This is the client half of the Meridian identity & data platform: the
//! library that constructs, validates, and prepares for submission the
//! *state transitions* mutating platform state — identities, data
//! contracts, documents — and that resolves the funding proofs an identity
//! registration requires.
//!
//! The server half (consensus, state-machine replication, storage) lives
//! node-side and is none of this crate's business. We prepare and locally
//! validate what we will submit, then trust network responses for
//! existence checks. That division keeps the client honest *and* thin.
//!
//! ## Architecture
//!
//! The modules mirror the actual concerns of a submitting client:
//!
//! - **identifier** — 32-byte content identifiers, three text encodings.
//! - **crypto** — double-SHA-256 derivation and entropy. Don't roll your own.
//! - **identity** — identities, public keys, signature verification.
//! - **data_contract** — the consumer-side view of contract schemas.
//! - **document** — transitions, the batch envelope, construction, and
//!   consensus-grade batch validation.
//! - **asset_lock** — funding proofs and the instant-vs-chain
//!   confirmation race.
//! - **nonce** — replay-safe sequencing with a TTL cache.
//! - **fetcher** — propagation-tolerant reads with Fibonacci backoff.
//! - **state_repository** — the read seam to the actual network.
//! - **validation** — aggregated results and code-bearing consensus errors.
//! - **config** — every protocol constant, in one place, on purpose.
//!
//! ## Design Philosophy
//!
//! 1. Validate locally exactly the way the platform will, or not at all.
//! 2. Structured errors with stable codes — callers branch on kind, never
//!    on message text.
//! 3. Every network capability sits behind a narrow trait. Tests inject
//!    fixtures; production injects transports.
//! 4. If it touches money or identity, it has tests. Plural.

pub mod asset_lock;
pub mod config;
pub mod crypto;
pub mod data_contract;
pub mod document;
pub mod fetcher;
pub mod identifier;
pub mod identity;
pub mod nonce;
pub mod state_repository;
pub mod validation;

pub use asset_lock::{AssetLockProof, AssetLockProofResolver};
pub use document::{BatchValidator, DocumentFactory, DocumentTransition, DocumentsBatchTransition};
pub use fetcher::RetryingFetcher;
pub use identifier::Identifier;
pub use nonce::NonceManager;
pub use validation::{ConsensusError, ValidationResult};
