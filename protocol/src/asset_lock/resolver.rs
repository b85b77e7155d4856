//! # Asset Lock Proof Resolver — the Confirmation Race
//!
//! Two independent sources can confirm the same funding transaction:
//!
//! - the **instant path**: the wallet observes an instant lock, usually
//!   within seconds;
//! - the **chain path**: the wallet observes the transaction mined at some
//!   height, after which we poll the platform's core-chain-locked height
//!   until it catches up.
//!
//! Both run concurrently; the first to produce a proof wins and the loser
//! is canceled **cooperatively** — `tokio::select!` drops the losing
//! branch, which tears down its pending sleep/poll and releases the
//! wallet subscription (implementations are required to clean up on drop).
//! No network call escapes a losing path after the winner resolves.
//!
//! Each path treats its *own* "not observed in time" as a non-fatal yield:
//! the branch converts its internal timeout into [`std::future::pending`]
//! and simply never resolves, leaving the race to the other path. Only the
//! **bounding timeout** — the larger of the two paths' windows plus
//! platform catch-up slack — can end the race with an error, and when it
//! fires both branches are dropped on the spot.

use std::future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::asset_lock::{
    AssetLockProof, ChainAssetLockProof, InstantAssetLockProof, OutPoint,
};
use crate::config::{
    CORE_CHAIN_CATCHUP_SLACK, CORE_CHAIN_LOCKED_HEIGHT_POLL_INTERVAL, INSTANT_LOCK_WAIT,
    TX_METADATA_WAIT,
};
use crate::state_repository::{RepositoryError, StateRepository};

// ---------------------------------------------------------------------------
// Wallet adapter
// ---------------------------------------------------------------------------

/// Metadata the wallet reports once a transaction is mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMetadata {
    /// Core-chain height of the block containing the transaction.
    pub height: u32,
}

/// Errors from the wallet's confirmation subscriptions.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The event did not arrive within the subscription window. Treated by
    /// the resolver as a yield to the other path, never as a race failure.
    #[error("not observed within {0:?}")]
    NotObserved(Duration),

    /// Any other wallet-side failure.
    #[error("wallet error: {0}")]
    Other(String),
}

/// The wallet-side confirmation subscriptions the resolver consumes.
///
/// Both methods are one-shot waits with an explicit window. Implementations
/// must be **cancel-safe**: dropping the returned future releases the
/// underlying subscription and any timers immediately — the resolver relies
/// on drop as its cancellation signal.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Wait until an instant lock for `tx_hash` is observed, returning the
    /// serialized lock.
    async fn wait_for_instant_lock(
        &self,
        tx_hash: &[u8; 32],
        timeout: Duration,
    ) -> Result<Vec<u8>, WalletError>;

    /// Wait until `tx_hash` is observed mined, returning its metadata.
    async fn wait_for_transaction_metadata(
        &self,
        tx_hash: &[u8; 32],
        timeout: Duration,
    ) -> Result<TransactionMetadata, WalletError>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from asset-lock proof resolution and verification.
#[derive(Debug, Error)]
pub enum AssetLockError {
    /// Neither confirmation path produced a proof before the bounding
    /// timeout. Fatal to the in-flight funding flow: restart with a new
    /// funding transaction or a longer window.
    #[error("no asset lock proof within {waited:?}")]
    AcquisitionTimeout {
        /// The bounding window that elapsed.
        waited: Duration,
    },

    /// The instant lock failed quorum verification.
    #[error("instant lock did not verify")]
    InstantLockInvalid,

    /// The funding outpoint was already consumed by an earlier operation.
    #[error("asset lock outpoint already used")]
    OutPointAlreadyUsed,

    /// The state repository failed while verifying a proof.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Races the instant and chain confirmation paths for a funding
/// transaction and returns whichever [`AssetLockProof`] materializes first.
pub struct AssetLockProofResolver<W, S> {
    wallet: W,
    state_repository: S,
    instant_wait: Duration,
    metadata_wait: Duration,
    poll_interval: Duration,
}

impl<W: WalletAdapter, S: StateRepository> AssetLockProofResolver<W, S> {
    /// A resolver with the stock timing configuration.
    pub fn new(wallet: W, state_repository: S) -> Self {
        Self {
            wallet,
            state_repository,
            instant_wait: INSTANT_LOCK_WAIT,
            metadata_wait: TX_METADATA_WAIT,
            poll_interval: CORE_CHAIN_LOCKED_HEIGHT_POLL_INTERVAL,
        }
    }

    /// Override the per-path windows and poll cadence.
    pub fn with_timing(
        mut self,
        instant_wait: Duration,
        metadata_wait: Duration,
        poll_interval: Duration,
    ) -> Self {
        self.instant_wait = instant_wait;
        self.metadata_wait = metadata_wait;
        self.poll_interval = poll_interval;
        self
    }

    /// Resolve a proof for the funding transaction.
    ///
    /// `tx_hash` is the wallet-convention (display-order) transaction hash;
    /// `transaction` the raw transaction bytes; `output_index` the funded
    /// output. `timeout_hint`, when given, replaces the computed bounding
    /// timeout (`max(instant, chain) + catch-up slack`).
    pub async fn resolve(
        &self,
        tx_hash: &[u8; 32],
        transaction: &[u8],
        output_index: u32,
        timeout_hint: Option<Duration>,
    ) -> Result<AssetLockProof, AssetLockError> {
        let bound = timeout_hint
            .unwrap_or_else(|| self.instant_wait.max(self.metadata_wait) + CORE_CHAIN_CATCHUP_SLACK);

        debug!(bound = ?bound, "racing instant and chain confirmation paths");
        let race = async {
            tokio::select! {
                proof = self.instant_path(tx_hash, transaction, output_index) => proof,
                proof = self.chain_path(tx_hash, output_index) => proof,
            }
        };

        match tokio::time::timeout(bound, race).await {
            Ok(proof) => Ok(proof),
            Err(_) => {
                debug!(waited = ?bound, "asset lock confirmation race timed out");
                Err(AssetLockError::AcquisitionTimeout { waited: bound })
            }
        }
    }

    /// Instant path: wait for an instant lock, build the proof directly.
    /// Not observing one in time yields the race to the chain path.
    async fn instant_path(
        &self,
        tx_hash: &[u8; 32],
        transaction: &[u8],
        output_index: u32,
    ) -> AssetLockProof {
        match self
            .wallet
            .wait_for_instant_lock(tx_hash, self.instant_wait)
            .await
        {
            Ok(instant_lock) => {
                debug!("instant lock observed");
                AssetLockProof::Instant(InstantAssetLockProof {
                    instant_lock,
                    transaction: transaction.to_vec(),
                    output_index,
                })
            }
            Err(error) => {
                debug!(%error, "instant path yielding to chain path");
                future::pending().await
            }
        }
    }

    /// Chain path: wait for the mined height, then poll the platform's
    /// core-chain-locked height until it catches up. Not observing the
    /// transaction mined in time yields the race to the instant path.
    async fn chain_path(&self, tx_hash: &[u8; 32], output_index: u32) -> AssetLockProof {
        let metadata = match self
            .wallet
            .wait_for_transaction_metadata(tx_hash, self.metadata_wait)
            .await
        {
            Ok(metadata) => metadata,
            Err(error) => {
                debug!(%error, "chain path yielding to instant path");
                return future::pending().await;
            }
        };

        debug!(height = metadata.height, "funding transaction mined; polling platform height");
        loop {
            match self
                .state_repository
                .fetch_latest_platform_core_chain_locked_height()
                .await
            {
                Ok(height) if height >= metadata.height => {
                    debug!(height, "platform chain caught up");
                    return AssetLockProof::Chain(ChainAssetLockProof {
                        core_chain_locked_height: height,
                        out_point: OutPoint::from_wallet_hash(tx_hash, output_index),
                    });
                }
                Ok(height) => {
                    trace!(platform = height, target = metadata.height, "platform chain lagging");
                }
                Err(error) => {
                    // Transient poll failure keeps the path alive; the
                    // bounding timeout is the backstop.
                    warn!(%error, "core-chain-locked height poll failed");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Verify a resolved proof against platform state: quorum-check the
    /// instant lock (instant variant only) and reject already-spent
    /// funding outpoints.
    pub async fn verify(&self, proof: &AssetLockProof) -> Result<(), AssetLockError> {
        if let AssetLockProof::Instant(instant) = proof {
            if !self
                .state_repository
                .verify_instant_lock(&instant.instant_lock)
                .await?
            {
                return Err(AssetLockError::InstantLockInvalid);
            }
        }

        let out_point = proof.out_point().to_bytes();
        if self
            .state_repository
            .is_asset_lock_out_point_already_used(&out_point)
            .await?
        {
            return Err(AssetLockError::OutPointAlreadyUsed);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
