//! # Nonce Manager — Replay-Safe Sequencing
//!
//! Every identity mutation carries a monotonically increasing nonce, and
//! contract-scoped document operations carry a per-(identity, contract)
//! nonce. The platform rejects reuse, which makes nonces the replay
//! protection for the whole client — and makes fetching one from the
//! network for every transition unbearably chatty.
//!
//! [`NonceManager`] is the cache in the middle: a fetched (or locally
//! bumped) value is trusted for [`NONCE_FETCH_INTERVAL`], after which it
//! must be re-confirmed — another session for the same identity may have
//! advanced the on-chain counter behind our back.
//!
//! ## Concurrency
//!
//! The manager performs **no internal locking** and takes `&mut self`, so
//! within one session the borrow checker enforces one operation at a time.
//! Serializing mutations *per identity across sessions* is the caller's
//! responsibility; two processes bumping the same identity concurrently
//! will race on the platform itself, not in this cache.
//!
//! Staleness is measured against an injected [`Clock`], so TTL behavior is
//! testable without wall-clock waits.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::config::NONCE_FETCH_INTERVAL;
use crate::identifier::Identifier;
use crate::state_repository::RepositoryError;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Time source for cache staleness checks.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

// ---------------------------------------------------------------------------
// PlatformClient
// ---------------------------------------------------------------------------

/// The nonce reads this manager performs against the platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Current identity nonce as known by the platform.
    async fn get_identity_nonce(
        &self,
        identity_id: &Identifier,
    ) -> Result<u64, RepositoryError>;

    /// Current (identity, contract) nonce as known by the platform.
    async fn get_identity_contract_nonce(
        &self,
        identity_id: &Identifier,
        contract_id: &Identifier,
    ) -> Result<u64, RepositoryError>;
}

// ---------------------------------------------------------------------------
// Cache internals
// ---------------------------------------------------------------------------

/// One cached counter with its fetch (or local-set) time.
#[derive(Debug, Clone, Copy)]
struct CachedNonce {
    value: u64,
    fetched_at: Instant,
}

/// Typed TTL cache over one key space.
#[derive(Debug)]
struct NonceCache<K> {
    entries: HashMap<K, CachedNonce>,
}

impl<K: Eq + Hash> NonceCache<K> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The cached value, if present and unexpired at `now`.
    fn fresh(&self, key: &K, now: Instant) -> Option<u64> {
        self.entries.get(key).and_then(|cached| {
            (now.duration_since(cached.fetched_at) < NONCE_FETCH_INTERVAL).then_some(cached.value)
        })
    }

    /// Store a value stamped at `now`.
    fn store(&mut self, key: K, value: u64, now: Instant) {
        self.entries.insert(
            key,
            CachedNonce {
                value,
                fetched_at: now,
            },
        );
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// NonceManager
// ---------------------------------------------------------------------------

/// Per-identity and per-(identity, contract) nonce cache.
pub struct NonceManager<P, C = SystemClock> {
    platform: P,
    clock: C,
    identity_nonces: NonceCache<Identifier>,
    contract_nonces: NonceCache<(Identifier, Identifier)>,
}

impl<P: PlatformClient> NonceManager<P> {
    /// A manager on the real clock.
    pub fn new(platform: P) -> Self {
        Self::with_clock(platform, SystemClock)
    }
}

impl<P: PlatformClient, C: Clock> NonceManager<P, C> {
    /// A manager on a caller-supplied clock.
    pub fn with_clock(platform: P, clock: C) -> Self {
        Self {
            platform,
            clock,
            identity_nonces: NonceCache::new(),
            contract_nonces: NonceCache::new(),
        }
    }

    /// Current identity nonce: cached if fresh, fetched otherwise.
    pub async fn identity_nonce(
        &mut self,
        identity_id: &Identifier,
    ) -> Result<u64, RepositoryError> {
        let now = self.clock.now();
        if let Some(value) = self.identity_nonces.fresh(identity_id, now) {
            return Ok(value);
        }

        debug!(identity = %identity_id, "fetching identity nonce");
        let value = self.platform.get_identity_nonce(identity_id).await?;
        self.identity_nonces.store(*identity_id, value, now);
        Ok(value)
    }

    /// Increment the identity nonce for the next transition.
    ///
    /// Loads a fresh value (cache or network), adds one, and stores the
    /// result stamped as current — a local bump reflects a mutation this
    /// session is about to confirm, so it resets the trust window.
    pub async fn bump_identity_nonce(
        &mut self,
        identity_id: &Identifier,
    ) -> Result<u64, RepositoryError> {
        let next = self.identity_nonce(identity_id).await? + 1;
        self.identity_nonces
            .store(*identity_id, next, self.clock.now());
        Ok(next)
    }

    /// Current (identity, contract) nonce: cached if fresh, fetched
    /// otherwise.
    pub async fn identity_contract_nonce(
        &mut self,
        identity_id: &Identifier,
        contract_id: &Identifier,
    ) -> Result<u64, RepositoryError> {
        let key = (*identity_id, *contract_id);
        let now = self.clock.now();
        if let Some(value) = self.contract_nonces.fresh(&key, now) {
            return Ok(value);
        }

        debug!(identity = %identity_id, contract = %contract_id, "fetching identity contract nonce");
        let value = self
            .platform
            .get_identity_contract_nonce(identity_id, contract_id)
            .await?;
        self.contract_nonces.store(key, value, now);
        Ok(value)
    }

    /// Increment the (identity, contract) nonce for the next transition.
    pub async fn bump_identity_contract_nonce(
        &mut self,
        identity_id: &Identifier,
        contract_id: &Identifier,
    ) -> Result<u64, RepositoryError> {
        let next = self
            .identity_contract_nonce(identity_id, contract_id)
            .await?
            + 1;
        self.contract_nonces
            .store((*identity_id, *contract_id), next, self.clock.now());
        Ok(next)
    }

    /// Drop every cached counter. The next access of any key re-fetches.
    pub fn reset(&mut self) {
        self.identity_nonces.clear();
        self.contract_nonces.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
