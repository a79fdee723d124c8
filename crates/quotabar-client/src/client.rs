//! Usage fetch client
//!
//! Owns at most one outstanding quota request. Callers arriving while a
//! request is in flight join it and receive the same result, so any
//! number of concurrent refresh triggers cost a single network call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::{debug, warn};

use crate::error::{FetchError, Result};
use crate::retry::RequestOptions;
use crate::transport::{Credential, HttpTransport, QuotaTransport};
use crate::usage::{normalize, QuotaDocument, UsageSnapshot};

type FetchFuture = BoxFuture<'static, Result<Arc<UsageSnapshot>>>;
type SharedFetch = Shared<FetchFuture>;

/// The slot only holds a weak handle: the fetch lives as long as some
/// caller is still awaiting it.
struct InFlight {
    generation: u64,
    future: WeakShared<FetchFuture>,
}

struct Inner {
    transport: Arc<dyn QuotaTransport>,
    in_flight: Mutex<Option<InFlight>>,
    next_generation: AtomicU64,
    last_snapshot: Mutex<Option<Arc<UsageSnapshot>>>,
}

/// Clears the in-flight slot when the shared fetch finishes, fails or is
/// dropped by its last waiter. Only clears the slot if it still holds the
/// same generation.
struct SlotRelease {
    inner: Arc<Inner>,
    generation: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        let mut slot = lock(&self.inner.in_flight);
        if slot
            .as_ref()
            .is_some_and(|f| f.generation == self.generation)
        {
            *slot = None;
        }
    }
}

/// Single-flight quota client. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct UsageClient {
    inner: Arc<Inner>,
}

impl UsageClient {
    /// Create a client over an arbitrary transport.
    #[must_use]
    pub fn new(transport: Arc<dyn QuotaTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                in_flight: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                last_snapshot: Mutex::new(None),
            }),
        }
    }

    /// Create a client talking HTTP to `endpoint`.
    #[must_use]
    pub fn http(endpoint: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpTransport::new(endpoint)))
    }

    /// Fetch the current usage snapshot.
    ///
    /// Joins the outstanding fetch if there is one; otherwise starts a new
    /// one with `token` and `options`. Retryable failures are retried with
    /// exponential backoff; the last error is returned unchanged.
    pub async fn fetch(
        &self,
        token: &Credential,
        options: &RequestOptions,
    ) -> Result<Arc<UsageSnapshot>> {
        self.join_or_start(token, options).await
    }

    /// Most recent successful snapshot.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<Arc<UsageSnapshot>> {
        lock(&self.inner.last_snapshot).clone()
    }

    /// Whether a fetch is currently outstanding.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        let weak = lock(&self.inner.in_flight)
            .as_ref()
            .map(|in_flight| in_flight.future.clone());
        // Upgrade outside the lock: dropping the last handle runs SlotRelease.
        weak.and_then(|w| w.upgrade()).is_some()
    }

    fn join_or_start(&self, token: &Credential, options: &RequestOptions) -> SharedFetch {
        let mut slot = lock(&self.inner.in_flight);
        if let Some(in_flight) = slot.as_ref() {
            if let Some(future) = in_flight.future.upgrade() {
                debug!(generation = in_flight.generation, "Joining in-flight quota fetch");
                return future;
            }
            debug!(generation = in_flight.generation, "Discarding abandoned quota fetch");
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);
        let token = token.clone();
        let options = options.clone();

        let future = async move {
            let _release = SlotRelease {
                inner: Arc::clone(&inner),
                generation,
            };
            inner.fetch_with_retry(&token, &options).await
        }
        .boxed()
        .shared();

        *slot = future
            .downgrade()
            .map(|weak| InFlight { generation, future: weak });
        future
    }
}

impl Inner {
    async fn fetch_with_retry(
        &self,
        token: &Credential,
        options: &RequestOptions,
    ) -> Result<Arc<UsageSnapshot>> {
        let max_attempts = options.retry.max_attempts();
        let mut attempt = 0;

        loop {
            debug!(attempt = attempt + 1, max_attempts, "Fetching quota");
            match self.fetch_once(token, options).await {
                Ok(snapshot) => {
                    let snapshot = Arc::new(snapshot);
                    *lock(&self.last_snapshot) = Some(Arc::clone(&snapshot));
                    return Ok(snapshot);
                }
                Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                    let delay = options.retry.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        kind = %err.kind(),
                        error = %err,
                        "Quota fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!(
                        attempts = attempt + 1,
                        kind = %err.kind(),
                        retryable = err.is_retryable(),
                        "Quota fetch failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn fetch_once(
        &self,
        token: &Credential,
        options: &RequestOptions,
    ) -> Result<UsageSnapshot> {
        let resp = self.transport.get(token, options.timeout()).await?;
        if !resp.is_success() {
            return Err(FetchError::from_status(resp.status, &resp.body));
        }

        let doc: QuotaDocument = serde_json::from_str(&resp.body)
            .map_err(|e| FetchError::validation("malformed quota response").with_cause(e))?;

        normalize(&doc, &options.budget, Utc::now())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
