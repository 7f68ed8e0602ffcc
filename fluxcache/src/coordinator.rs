//! Per-request orchestration: decode, look up, fetch, persist, serve.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use fluxcache_backend::CacheBackend;
use fluxcache_core::{
    CacheContext, CacheKey, ModulePath, ProxyRequest, ProxyResponse, ResponseSource, Upstream,
    UpstreamRequest,
};
use http::StatusCode;
use http_body::Body;
use http_body_util::BodyExt;
use tracing::{debug, warn};

use crate::concurrency::{ConcurrencyDecision, ConcurrencyManager, NoopConcurrencyManager};
use crate::config::DEFAULT_UPSTREAM;
use crate::error::{BoxError, ProxyError, UpstreamFailure};
use crate::metrics;

/// What a request resolves to, before it is rendered as HTTP.
pub type FetchOutcome = Result<ProxyResponse, ProxyError>;

/// Serves module-fetch requests from a cache backend, falling back to an
/// upstream registry on a miss.
///
/// Every request is independent: the coordinator holds no per-request
/// state, so a single instance (usually behind an `Arc`) serves all
/// connections. Concurrent misses for the same key are deduplicated by the
/// concurrency manager; the default [`NoopConcurrencyManager`] lets each
/// request fetch on its own.
///
/// # Examples
///
/// ```ignore
/// use fluxcache::{BroadcastConcurrencyManager, FetchCoordinator};
/// use fluxcache_backend::DiskBackend;
///
/// let coordinator = FetchCoordinator::builder()
///     .backend(DiskBackend::builder().root("./fluxcache").build()?)
///     .upstream(my_upstream)
///     .upstream_base("https://proxy.golang.org")
///     .concurrency_manager(BroadcastConcurrencyManager::new())
///     .build();
///
/// let (outcome, ctx) = coordinator.handle(ProxyRequest::get("/golang.org/x/text/@v/list")).await;
/// ```
pub struct FetchCoordinator<B, U, CM = NoopConcurrencyManager> {
    backend: Arc<B>,
    upstream: U,
    upstream_base: Arc<str>,
    concurrency_manager: CM,
}

impl FetchCoordinator<NotSet, NotSet, NoopConcurrencyManager> {
    /// Creates a new [`FetchCoordinatorBuilder`].
    pub fn builder() -> FetchCoordinatorBuilder<NotSet, NotSet, NoopConcurrencyManager> {
        FetchCoordinatorBuilder::new()
    }
}

impl<B, U, CM> FetchCoordinator<B, U, CM> {
    /// Returns the cache backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Returns the upstream base URI.
    pub fn upstream_base(&self) -> &str {
        &self.upstream_base
    }

    /// Returns the concurrency manager.
    pub fn concurrency_manager(&self) -> &CM {
        &self.concurrency_manager
    }
}

impl<B, U, CM, ResBody, E> FetchCoordinator<B, U, CM>
where
    B: CacheBackend + Send + Sync + 'static,
    U: Upstream<UpstreamRequest, Response = Result<http::Response<ResBody>, E>>
        + Clone
        + Send
        + Sync,
    ResBody: Body + Send,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
    E: Into<BoxError>,
    CM: ConcurrencyManager<FetchOutcome>,
{
    /// Handles one request.
    ///
    /// Never fails as a whole: the outcome carries either the response or the
    /// client-facing error, and the context records what the cache did.
    pub async fn handle(&self, request: ProxyRequest) -> (FetchOutcome, CacheContext) {
        let started = Instant::now();
        let mut ctx = CacheContext::default();
        let outcome = self.process(&request, &mut ctx).await;
        metrics::record_context_metrics(&ctx, started.elapsed());
        (outcome, ctx)
    }

    async fn process(&self, request: &ProxyRequest, ctx: &mut CacheContext) -> FetchOutcome {
        let path = ModulePath::from_request_path(request.path()).inspect_err(|error| {
            debug!(path = request.path(), %error, "rejecting undecodable path");
        })?;
        let key = CacheKey::from_module_path(&path);

        match self.backend.get(&key, ctx).await {
            Ok(Some(body)) => {
                debug!(module = %path, %key, size = body.len(), "cache hit");
                return Ok(ProxyResponse::from_artifact(body, path.file_name()));
            }
            Ok(None) => debug!(module = %path, %key, "cache miss, fetching"),
            Err(error) => {
                warn!(module = %path, %key, %error, "cache read failed, treating as miss");
            }
        }

        // A lost flight sends every waiter back here: one of them becomes the
        // new leader and the rest join it.
        loop {
            match self.concurrency_manager.check(&key) {
                ConcurrencyDecision::Proceed => {
                    let flight = FlightGuard::new(&self.concurrency_manager, key);
                    let outcome = self.fetch_and_store(&key, request, ctx).await;
                    return flight.complete(outcome);
                }
                ConcurrencyDecision::Await(waiter) => match waiter.await {
                    Ok(outcome) => {
                        debug!(module = %path, "joined in-flight fetch");
                        ctx.source = ResponseSource::Coalesced;
                        return outcome;
                    }
                    Err(error) => {
                        warn!(module = %path, %error, "in-flight fetch lost, retrying");
                        if let Ok(Some(body)) = self.backend.get(&key, ctx).await {
                            debug!(module = %path, %key, "artifact stored by lost flight");
                            return Ok(ProxyResponse::from_artifact(body, path.file_name()));
                        }
                    }
                },
            }
        }
    }

    async fn fetch_and_store(
        &self,
        key: &CacheKey,
        request: &ProxyRequest,
        ctx: &mut CacheContext,
    ) -> FetchOutcome {
        let upstream_request =
            UpstreamRequest::build(&self.upstream_base, request.path(), request.query())
                .map_err(ProxyError::transport)?;
        let target = upstream_request.to_string();

        let started = Instant::now();
        let mut upstream = self.upstream.clone();
        let result = upstream.call(upstream_request).await;
        metrics::record_upstream_duration(started.elapsed());

        let response = result.map_err(|error| {
            let error = ProxyError::transport(error);
            warn!(upstream = %target, %error, "upstream request failed");
            error
        })?;

        let (parts, body) = response.into_parts();
        if parts.status != StatusCode::OK {
            debug!(upstream = %target, status = %parts.status, "upstream refused");
            return Err(ProxyError::UpstreamUnavailable(UpstreamFailure::Status(
                parts.status,
            )));
        }

        let body = body
            .collect()
            .await
            .map_err(|error| {
                let error = ProxyError::body(error);
                warn!(upstream = %target, %error, "upstream body read failed");
                error
            })?
            .to_bytes();

        if let Err(error) = self.backend.set(key, body.clone(), ctx).await {
            warn!(%key, %error, "failed to persist artifact, serving anyway");
        }

        Ok(ProxyResponse::new(parts.status, parts.headers, body))
    }
}

impl<B, U, CM> Clone for FetchCoordinator<B, U, CM>
where
    U: Clone,
    CM: Clone,
{
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            upstream: self.upstream.clone(),
            upstream_base: Arc::clone(&self.upstream_base),
            concurrency_manager: self.concurrency_manager.clone(),
        }
    }
}

impl<B, U, CM> fmt::Debug for FetchCoordinator<B, U, CM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("backend", &std::any::type_name::<B>())
            .field("upstream", &std::any::type_name::<U>())
            .field("upstream_base", &self.upstream_base)
            .field("concurrency_manager", &std::any::type_name::<CM>())
            .finish()
    }
}

/// Releases the flight registration if the leader is dropped mid-fetch.
struct FlightGuard<'a, CM>
where
    CM: ConcurrencyManager<FetchOutcome>,
{
    manager: &'a CM,
    key: CacheKey,
    armed: bool,
}

impl<'a, CM> FlightGuard<'a, CM>
where
    CM: ConcurrencyManager<FetchOutcome>,
{
    fn new(manager: &'a CM, key: CacheKey) -> Self {
        Self {
            manager,
            key,
            armed: true,
        }
    }

    fn complete(mut self, outcome: FetchOutcome) -> FetchOutcome {
        self.armed = false;
        self.manager.complete(&self.key, outcome)
    }
}

impl<CM> Drop for FlightGuard<'_, CM>
where
    CM: ConcurrencyManager<FetchOutcome>,
{
    fn drop(&mut self) {
        if self.armed {
            warn!(key = %self.key, "in-flight fetch abandoned");
            self.manager.abandon(&self.key);
        }
    }
}

/// Marker type for unset builder fields.
///
/// When you see `NotSet` in a compiler error, it means you haven't called
/// the corresponding builder method yet.
#[derive(Debug, Clone, Copy)]
pub struct NotSet;

/// Builder for [`FetchCoordinator`].
pub struct FetchCoordinatorBuilder<B, U, CM> {
    backend: B,
    upstream: U,
    upstream_base: String,
    concurrency_manager: CM,
}

impl FetchCoordinatorBuilder<NotSet, NotSet, NoopConcurrencyManager> {
    /// Creates a builder targeting the default upstream, without single-flight.
    pub fn new() -> Self {
        Self {
            backend: NotSet,
            upstream: NotSet,
            upstream_base: DEFAULT_UPSTREAM.to_owned(),
            concurrency_manager: NoopConcurrencyManager,
        }
    }
}

impl Default for FetchCoordinatorBuilder<NotSet, NotSet, NoopConcurrencyManager> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, U, CM> FetchCoordinatorBuilder<B, U, CM> {
    /// Sets the cache backend.
    pub fn backend<NB>(self, backend: NB) -> FetchCoordinatorBuilder<NB, U, CM> {
        FetchCoordinatorBuilder {
            backend,
            upstream: self.upstream,
            upstream_base: self.upstream_base,
            concurrency_manager: self.concurrency_manager,
        }
    }

    /// Sets the upstream-fetch capability.
    pub fn upstream<NU>(self, upstream: NU) -> FetchCoordinatorBuilder<B, NU, CM> {
        FetchCoordinatorBuilder {
            backend: self.backend,
            upstream,
            upstream_base: self.upstream_base,
            concurrency_manager: self.concurrency_manager,
        }
    }

    /// Sets the concurrency manager.
    pub fn concurrency_manager<NCM>(
        self,
        concurrency_manager: NCM,
    ) -> FetchCoordinatorBuilder<B, U, NCM> {
        FetchCoordinatorBuilder {
            backend: self.backend,
            upstream: self.upstream,
            upstream_base: self.upstream_base,
            concurrency_manager,
        }
    }

    /// Sets the upstream base URI. Trailing slashes are dropped.
    pub fn upstream_base(self, upstream_base: impl Into<String>) -> Self {
        Self {
            upstream_base: upstream_base.into(),
            ..self
        }
    }
}

impl<B, U, CM> FetchCoordinatorBuilder<B, U, CM>
where
    B: CacheBackend,
{
    /// Builds the [`FetchCoordinator`].
    ///
    /// Backend and upstream must be set before calling this method.
    pub fn build(self) -> FetchCoordinator<B, U, CM> {
        FetchCoordinator {
            backend: Arc::new(self.backend),
            upstream: self.upstream,
            upstream_base: Arc::from(self.upstream_base.trim_end_matches('/')),
            concurrency_manager: self.concurrency_manager,
        }
    }
}
