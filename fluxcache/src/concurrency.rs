use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fluxcache_core::CacheKey;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Why a waiter did not receive the leader's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConcurrencyError {
    /// The leading request was dropped before it completed.
    #[error("in-flight request was abandoned")]
    Abandoned,
    /// The waiter fell behind the broadcast channel.
    #[error("in-flight response was missed")]
    Lagged,
}

/// Result of concurrency check - whether to proceed with upstream call or await existing response
pub enum ConcurrencyDecision<Res> {
    /// Proceed with the upstream call
    Proceed,
    /// Await response from another in-flight request
    Await(BoxFuture<'static, Result<Res, ConcurrencyError>>),
}

impl<Res> fmt::Debug for ConcurrencyDecision<Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyDecision::Proceed => f.write_str("Proceed"),
            ConcurrencyDecision::Await(_) => f.write_str("Await"),
        }
    }
}

/// Trait for managing concurrent requests to prevent dogpile effect
pub trait ConcurrencyManager<Res>: Send + Sync {
    /// Check if this request should proceed to upstream or await an existing request
    fn check(&self, cache_key: &CacheKey) -> ConcurrencyDecision<Res>;

    /// Notify waiting requests that the response is ready and return it back
    fn complete(&self, cache_key: &CacheKey, response: Res) -> Res;

    /// Release a key whose leading request will never call [`complete`](Self::complete).
    ///
    /// Waiters observe [`ConcurrencyError::Abandoned`].
    fn abandon(&self, _cache_key: &CacheKey) {}
}

/// No-op implementation that always allows requests to proceed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConcurrencyManager;

impl<Res> ConcurrencyManager<Res> for NoopConcurrencyManager
where
    Res: Send + 'static,
{
    fn check(&self, _cache_key: &CacheKey) -> ConcurrencyDecision<Res> {
        ConcurrencyDecision::Proceed
    }

    fn complete(&self, _cache_key: &CacheKey, response: Res) -> Res {
        response
    }
}

/// Single-flight manager: one request per key fetches, the rest wait for it.
///
/// The first `check` for a key registers a broadcast channel and proceeds.
/// Every `check` for the same key until `complete` (or `abandon`) subscribes
/// to that channel. The leader's outcome, success or error, is cloned to all
/// subscribers.
///
/// Clones share the same registry.
pub struct BroadcastConcurrencyManager<Res> {
    in_flight: Arc<DashMap<CacheKey, broadcast::Sender<Res>>>,
}

impl<Res> BroadcastConcurrencyManager<Res> {
    /// Creates a manager with an empty registry.
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Number of keys with a request currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl<Res> Default for BroadcastConcurrencyManager<Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Res> Clone for BroadcastConcurrencyManager<Res> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<Res> fmt::Debug for BroadcastConcurrencyManager<Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastConcurrencyManager")
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl<Res> ConcurrencyManager<Res> for BroadcastConcurrencyManager<Res>
where
    Res: Clone + Send + Sync + 'static,
{
    fn check(&self, cache_key: &CacheKey) -> ConcurrencyDecision<Res> {
        match self.in_flight.entry(*cache_key) {
            Entry::Occupied(entry) => {
                // Subscribed under the shard lock, so the leader cannot send
                // between our lookup and our subscription.
                let mut receiver = entry.get().subscribe();
                ConcurrencyDecision::Await(Box::pin(async move {
                    match receiver.recv().await {
                        Ok(response) => Ok(response),
                        Err(RecvError::Closed) => Err(ConcurrencyError::Abandoned),
                        Err(RecvError::Lagged(_)) => Err(ConcurrencyError::Lagged),
                    }
                }))
            }
            Entry::Vacant(entry) => {
                let (sender, _) = broadcast::channel(1);
                entry.insert(sender);
                ConcurrencyDecision::Proceed
            }
        }
    }

    fn complete(&self, cache_key: &CacheKey, response: Res) -> Res {
        if let Some((_, sender)) = self.in_flight.remove(cache_key) {
            // No receivers is fine: nobody joined this flight.
            let _ = sender.send(response.clone());
        }
        response
    }

    fn abandon(&self, cache_key: &CacheKey) {
        self.in_flight.remove(cache_key);
    }
}
