//! # State Repository — Platform Read Capabilities
//!
//! The narrow seam between this protocol layer and the actual network
//! transport. Everything the validator and the asset-lock machinery need
//! to *read* from the platform goes through [`StateRepository`]; the
//! implementation (gRPC client, test fixture, cache) is the caller's
//! business. Keeping the trait surface small is the point — the protocol
//! layer should not know what a connection pool is.

use async_trait::async_trait;
use thiserror::Error;

use crate::data_contract::DataContract;
use crate::identifier::Identifier;
use crate::identity::Identity;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by state repository implementations.
///
/// Absence is **not** an error — the fetch methods return `Option` for
/// that. These variants cover genuine failures: transport trouble and
/// responses the client cannot interpret.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Transport-level failure (connection refused, timeout, broken stream).
    /// Eligible for retry at the call site per the fetcher policy.
    #[error("network error: {0}")]
    Network(String),

    /// The platform answered with something this client cannot decode.
    /// Not retryable — the same bytes will fail the same way.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// Fetched values
// ---------------------------------------------------------------------------

/// A core-chain transaction as returned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTransaction {
    /// Raw transaction bytes.
    pub data: Vec<u8>,

    /// Block height the transaction was mined at, if mined.
    pub height: Option<u32>,
}

// ---------------------------------------------------------------------------
// StateRepository
// ---------------------------------------------------------------------------

/// Read access to platform state.
///
/// All methods are async because every one of them is a network round trip
/// in production. Implementations must be cheap to share (`&self` methods);
/// the protocol layer never mutates platform state through this trait.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Fetch an identity by id. `None` means the identity does not exist.
    async fn fetch_identity(&self, id: &Identifier)
        -> Result<Option<Identity>, RepositoryError>;

    /// Fetch a data contract by id. `None` means no such contract.
    async fn fetch_data_contract(
        &self,
        id: &Identifier,
    ) -> Result<Option<DataContract>, RepositoryError>;

    /// Fetch a core-chain transaction by its hash.
    async fn fetch_transaction(
        &self,
        tx_hash: &[u8; 32],
    ) -> Result<Option<FetchedTransaction>, RepositoryError>;

    /// The platform's latest observed core-chain-locked height.
    async fn fetch_latest_platform_core_chain_locked_height(
        &self,
    ) -> Result<u32, RepositoryError>;

    /// Whether a funding outpoint has already been consumed by an earlier
    /// identity operation.
    async fn is_asset_lock_out_point_already_used(
        &self,
        out_point: &[u8; 36],
    ) -> Result<bool, RepositoryError>;

    /// Verify an instant lock signature against the active quorums.
    async fn verify_instant_lock(&self, instant_lock: &[u8]) -> Result<bool, RepositoryError>;
}
