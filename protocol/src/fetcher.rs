//! # Retrying Fetcher — Propagation-Tolerant Reads
//!
//! Right after a client submits a mutation, reads of the affected entity
//! sit in an awkward window: the mutation is confirmed locally but the
//! node answering the read may not have caught up yet. Treating that
//! not-found as final would make every submit-then-read flow flaky.
//!
//! The policy: the caller **acknowledges** a key when it has just mutated
//! the entity behind it. Reads of acknowledged keys retry up to a bounded
//! number of attempts, spaced by a Fibonacci-scaled backoff
//! (`delay = fibonacci(attempt) × base_delay`). Reads of unacknowledged
//! keys get exactly one attempt — absence is then a legitimate,
//! non-retryable answer.
//!
//! Retries are strictly sequential: one attempt in flight at a time,
//! never a concurrent fan-out.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::{FETCH_BASE_DELAY, FETCH_MAX_ATTEMPTS};
use crate::identifier::Identifier;

// ---------------------------------------------------------------------------
// Backoff schedule
// ---------------------------------------------------------------------------

/// The Fibonacci number used to scale the delay after attempt `n`
/// (1-indexed): 1, 1, 2, 3, 5, 8, ...
///
/// Fibonacci grows gently at first — propagation lag is usually a
/// sub-second affair — while still backing off meaningfully when the
/// network is genuinely behind.
pub fn fibonacci(n: u32) -> u64 {
    let mut pair = (1u64, 1u64);
    for _ in 2..n.max(1) {
        pair = (pair.1, pair.0 + pair.1);
    }
    if n <= 2 {
        1
    } else {
        pair.1
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Terminal failure after the retry budget is spent.
#[derive(Debug, Error)]
pub enum FetchError<E: std::error::Error + Send + Sync + 'static> {
    /// Every attempt failed; carries the final underlying error.
    #[error("all {attempts} fetch attempts for '{key}' failed")]
    AttemptsExhausted {
        /// The fetch key that kept failing.
        key: String,
        /// How many attempts were actually made.
        attempts: u32,
        /// The last attempt's error.
        #[source]
        last_error: E,
    },
}

// ---------------------------------------------------------------------------
// RetryingFetcher
// ---------------------------------------------------------------------------

/// Bounded-retry wrapper around network reads.
///
/// Keys are plain strings; [`RetryingFetcher::acknowledge_identifier`] is
/// sugar for the common identifier-keyed case.
pub struct RetryingFetcher {
    acknowledged: HashSet<String>,
    base_delay: Duration,
    max_attempts: u32,
}

impl Default for RetryingFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryingFetcher {
    /// A fetcher with the stock policy.
    pub fn new() -> Self {
        Self::with_policy(FETCH_BASE_DELAY, FETCH_MAX_ATTEMPTS)
    }

    /// A fetcher with a custom base delay and attempt cap.
    pub fn with_policy(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            acknowledged: HashSet::new(),
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Mark a key as recently mutated: the network is expected to catch
    /// up, so reads of it become retryable.
    pub fn acknowledge_key(&mut self, key: impl Into<String>) {
        self.acknowledged.insert(key.into());
    }

    /// Acknowledge an identifier-keyed entity.
    pub fn acknowledge_identifier(&mut self, id: &Identifier) {
        self.acknowledge_key(id.to_base58());
    }

    /// Forget an acknowledgement; reads of the key go back to one attempt.
    pub fn forget_key(&mut self, key: &str) {
        self.acknowledged.remove(key);
    }

    /// Whether a key is currently acknowledged.
    pub fn is_acknowledged(&self, key: &str) -> bool {
        self.acknowledged.contains(key)
    }

    /// Run `operation` under the retry policy for `key`, using the
    /// fetcher's configured attempt cap.
    ///
    /// The operation receives the 1-indexed attempt number. Acknowledged
    /// keys retry up to the maximum with Fibonacci-scaled delays between
    /// attempts; unacknowledged keys get exactly one attempt. The final
    /// failure surfaces as [`FetchError::AttemptsExhausted`] wrapping the
    /// last error.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, operation: F) -> Result<T, FetchError<E>>
    where
        E: std::error::Error + Send + Sync + 'static,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.fetch_with_attempts(key, self.max_attempts, operation)
            .await
    }

    /// Like [`RetryingFetcher::fetch`], with a per-call cap on attempts
    /// for acknowledged keys. Unacknowledged keys still get exactly one.
    pub async fn fetch_with_attempts<T, E, F, Fut>(
        &self,
        key: &str,
        max_attempts_if_acknowledged: u32,
        mut operation: F,
    ) -> Result<T, FetchError<E>>
    where
        E: std::error::Error + Send + Sync + 'static,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let budget = if self.is_acknowledged(key) {
            max_attempts_if_acknowledged.max(1)
        } else {
            1
        };
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if attempt >= budget {
                        return Err(FetchError::AttemptsExhausted {
                            key: key.to_string(),
                            attempts: attempt,
                            last_error: error,
                        });
                    }
                    let delay = self.delay_after(attempt);
                    debug!(key, attempt, ?delay, %error, "fetch attempt failed; backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Document-fetch specialization: a zero-result read counts as
    /// not-found and is retried under the same policy. After the budget is
    /// spent, an empty result is returned as-is — absence is a legitimate
    /// outcome, not an error.
    pub async fn fetch_documents<T, E, F, Fut>(
        &self,
        key: &str,
        mut operation: F,
    ) -> Result<Vec<T>, FetchError<E>>
    where
        E: std::error::Error + Send + Sync + 'static,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        let budget = self.attempt_budget(key);
        let mut attempt = 1;
        loop {
            let outcome = operation(attempt).await;
            match outcome {
                Ok(documents) if !documents.is_empty() => return Ok(documents),
                Ok(documents) => {
                    if attempt >= budget {
                        return Ok(documents);
                    }
                    debug!(key, attempt, "zero documents; treating as propagation lag");
                }
                Err(error) => {
                    if attempt >= budget {
                        return Err(FetchError::AttemptsExhausted {
                            key: key.to_string(),
                            attempts: attempt,
                            last_error: error,
                        });
                    }
                    debug!(key, attempt, %error, "document fetch failed; backing off");
                }
            }
            tokio::time::sleep(self.delay_after(attempt)).await;
            attempt += 1;
        }
    }

    fn attempt_budget(&self, key: &str) -> u32 {
        if self.is_acknowledged(key) {
            self.max_attempts
        } else {
            1
        }
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * fibonacci(attempt) as u32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Debug, Error)]
    #[error("backend unavailable")]
    struct TestError;

    #[test]
    fn fibonacci_schedule() {
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(2), 1);
        assert_eq!(fibonacci(3), 2);
        assert_eq!(fibonacci(4), 3);
        assert_eq!(fibonacci(5), 5);
        assert_eq!(fibonacci(6), 8);
        assert_eq!(fibonacci(7), 13);
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_key_gets_exactly_one_attempt() {
        let fetcher = RetryingFetcher::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<(), _> = fetcher
            .fetch("unknown-key", move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError)
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(FetchError::AttemptsExhausted { attempts: 1, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledged_key_retries_with_fibonacci_delays() {
        let base = Duration::from_millis(100);
        let mut fetcher = RetryingFetcher::with_policy(base, 5);
        fetcher.acknowledge_key("doc-1");

        let timestamps = Arc::new(Mutex::new(Vec::<Instant>::new()));
        let recorder = timestamps.clone();
        let result: Result<(), _> = fetcher
            .fetch("doc-1", move |_| {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push(Instant::now());
                    Err::<(), _>(TestError)
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(FetchError::AttemptsExhausted { attempts: 5, .. })
        ));

        let timestamps = timestamps.lock().unwrap();
        assert_eq!(timestamps.len(), 5);
        // Gaps follow fibonacci(attempt) * base: 1, 1, 2, 3 — strictly
        // non-decreasing.
        let gaps: Vec<Duration> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps, vec![base, base, base * 2, base * 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledged_key_returns_first_success() {
        let mut fetcher = RetryingFetcher::with_policy(Duration::from_millis(50), 7);
        fetcher.acknowledge_key("identity-1");

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let value = fetcher
            .fetch("identity-1", move |attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(TestError)
                    } else {
                        Ok(42u64)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_attempt_cap_overrides_the_policy() {
        let mut fetcher = RetryingFetcher::with_policy(Duration::from_millis(50), 7);
        fetcher.acknowledge_key("doc-3");

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = fetcher
            .fetch_with_attempts("doc-3", 2, move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError)
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(FetchError::AttemptsExhausted { attempts: 2, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn forgotten_key_reverts_to_single_attempt() {
        let mut fetcher = RetryingFetcher::with_policy(Duration::from_millis(50), 7);
        fetcher.acknowledge_key("doc-2");
        fetcher.forget_key("doc-2");

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let _ = fetcher
            .fetch("doc-2", move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError)
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_document_reads_are_retried_until_populated() {
        let mut fetcher = RetryingFetcher::with_policy(Duration::from_millis(50), 7);
        fetcher.acknowledge_key("query-1");

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let documents = fetcher
            .fetch_documents("query-1", move |attempt| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // Propagation lag: the first two reads see nothing.
                    if attempt < 3 {
                        Ok::<_, TestError>(vec![])
                    } else {
                        Ok(vec!["document"])
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(documents, vec!["document"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn persistently_empty_reads_return_empty_after_budget() {
        let mut fetcher = RetryingFetcher::with_policy(Duration::from_millis(50), 3);
        fetcher.acknowledge_key("query-2");

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let documents: Vec<&str> = fetcher
            .fetch_documents("query-2", move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>(vec![])
                }
            })
            .await
            .unwrap();

        assert!(documents.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_empty_read_is_returned_immediately() {
        let fetcher = RetryingFetcher::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let documents: Vec<&str> = fetcher
            .fetch_documents("cold-query", move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>(vec![])
                }
            })
            .await
            .unwrap();

        assert!(documents.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn identifier_acknowledgement_uses_base58_key() {
        let mut fetcher = RetryingFetcher::with_policy(Duration::from_millis(10), 2);
        let id = Identifier::new([11u8; 32]);
        fetcher.acknowledge_identifier(&id);

        assert!(fetcher.is_acknowledged(&id.to_base58()));

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let _ = fetcher
            .fetch(&id.to_base58(), move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError)
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
