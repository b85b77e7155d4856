//! # Protocol Configuration & Constants
//!
//! Every magic number in the Meridian client protocol lives here. If you're
//! hardcoding a constant somewhere else, you're doing it wrong and you owe
//! the team coffee.
//!
//! Most of these values are consensus-adjacent: the platform rejects state
//! transitions that violate them, so changing one here without a matching
//! network upgrade just moves the failure from your machine to the node's.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Current protocol version carried in every state transition envelope.
/// Validators apply the rule set matching this version.
pub const PROTOCOL_VERSION: u32 = 1;

/// Lowest protocol version this client can still construct and validate.
pub const MIN_SUPPORTED_PROTOCOL_VERSION: u32 = 1;

/// Type discriminator for a documents-batch state transition in the wire
/// envelope. Identity and contract transitions use other discriminators;
/// this crate only constructs batches.
pub const DOCUMENTS_BATCH_TRANSITION_TYPE: u8 = 1;

// ---------------------------------------------------------------------------
// Sizes & Bounds
// ---------------------------------------------------------------------------

/// Content identifiers are exactly 32 bytes. Everywhere. No exceptions.
pub const IDENTIFIER_LENGTH: usize = 32;

/// Entropy attached to a document-create transition. 32 bytes of CSPRNG
/// output; the derived document id commits to it.
pub const ENTROPY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

/// A documents batch carries at least one transition.
pub const MIN_BATCH_TRANSITIONS: usize = 1;

/// And at most ten. The cap bounds per-transition validation work on the
/// node side; batching beyond it means submitting multiple transitions.
pub const MAX_BATCH_TRANSITIONS: usize = 10;

/// First revision of a freshly created document. Replace transitions must
/// carry a revision of at least this value.
pub const INITIAL_REVISION: u64 = 1;

// ---------------------------------------------------------------------------
// Nonce Cache
// ---------------------------------------------------------------------------

/// How long a fetched (or locally bumped) nonce stays trustworthy.
///
/// Another session for the same identity may advance the on-chain nonce
/// behind our back; past this interval the cached value must be
/// re-confirmed against the network before use.
pub const NONCE_FETCH_INTERVAL: Duration = Duration::from_secs(20 * 60);

/// Nonce cache interval as milliseconds, for APIs that want a u64.
/// Keep in sync with [`NONCE_FETCH_INTERVAL`] or face the integration tests.
pub const NONCE_FETCH_INTERVAL_MS: u64 = 20 * 60 * 1_000;

// ---------------------------------------------------------------------------
// Asset Lock Confirmation
// ---------------------------------------------------------------------------

/// How long the instant path waits for an instant lock before yielding the
/// race to the chain path. Instant locks usually land within seconds; if
/// one hasn't shown up in this window, it isn't coming.
pub const INSTANT_LOCK_WAIT: Duration = Duration::from_secs(90);

/// How long the chain path waits for the funding transaction to be mined.
/// Generous on purpose: this is the fallback path and mining can lag.
pub const TX_METADATA_WAIT: Duration = Duration::from_secs(360);

/// Poll interval for the platform's core-chain-locked height while the
/// chain path waits for it to catch up to the funding transaction's block.
pub const CORE_CHAIN_LOCKED_HEIGHT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Extra slack added to the bounding timeout of the confirmation race,
/// covering the gap between the funding transaction being mined and the
/// platform chain acknowledging that height.
pub const CORE_CHAIN_CATCHUP_SLACK: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Retrying Fetcher
// ---------------------------------------------------------------------------

/// Base delay multiplied by `fibonacci(attempt)` between retry attempts.
pub const FETCH_BASE_DELAY: Duration = Duration::from_millis(200);

/// Default maximum attempts for an acknowledged key. With the Fibonacci
/// schedule this gives roughly six and a half seconds of total backoff
/// before the last error surfaces.
pub const FETCH_MAX_ATTEMPTS: u32 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_bounds_sane() {
        assert!(MIN_BATCH_TRANSITIONS >= 1);
        assert!(MIN_BATCH_TRANSITIONS < MAX_BATCH_TRANSITIONS);
    }

    #[test]
    fn nonce_interval_twins_agree() {
        assert_eq!(NONCE_FETCH_INTERVAL.as_millis() as u64, NONCE_FETCH_INTERVAL_MS);
    }

    #[test]
    fn race_bound_exceeds_both_paths() {
        // The bounding timeout is derived from these; slack must be positive
        // or the chain path can never catch up after mining.
        assert!(CORE_CHAIN_CATCHUP_SLACK > Duration::ZERO);
        assert!(TX_METADATA_WAIT > INSTANT_LOCK_WAIT);
    }

    #[test]
    fn crypto_parameter_sizes() {
        assert_eq!(IDENTIFIER_LENGTH, 32);
        assert_eq!(ENTROPY_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
    }
}
