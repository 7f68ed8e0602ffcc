use fluxcache::{FetchCoordinator, NoopConcurrencyManager, NotSet};
use fluxcache::config::DEFAULT_UPSTREAM;
use fluxcache_backend::CacheBackend;
use http::HeaderName;
use tower::Layer;

use crate::service::ProxyService;
use crate::upstream::TowerUpstream;

/// Tower layer turning an HTTP client service into a [`ProxyService`].
///
/// The wrapped service becomes the upstream: it receives a bodiless `GET`
/// for every cache miss.
///
/// # Examples
///
/// ```ignore
/// use fluxcache_backend::DiskBackend;
/// use fluxcache_tower::{BroadcastConcurrencyManager, ProxyLayer};
/// use tower::ServiceBuilder;
///
/// let layer = ProxyLayer::builder()
///     .backend(DiskBackend::builder().root("./fluxcache").build()?)
///     .upstream_base("https://proxy.golang.org")
///     .concurrency_manager(BroadcastConcurrencyManager::new())
///     .build();
///
/// let service = ServiceBuilder::new().layer(layer).service(http_client);
/// ```
#[derive(Debug, Clone)]
pub struct ProxyLayer<B, CM = NoopConcurrencyManager> {
    backend: B,
    upstream_base: String,
    concurrency_manager: CM,
    cache_status_header: HeaderName,
}

impl ProxyLayer<NotSet, NoopConcurrencyManager> {
    /// Creates a new [`ProxyLayerBuilder`].
    pub fn builder() -> ProxyLayerBuilder<NotSet, NoopConcurrencyManager> {
        ProxyLayerBuilder::new()
    }
}

impl<S, B, CM> Layer<S> for ProxyLayer<B, CM>
where
    B: CacheBackend + Clone,
    CM: Clone,
{
    type Service = ProxyService<B, TowerUpstream<S>, CM>;

    fn layer(&self, upstream: S) -> Self::Service {
        let coordinator = FetchCoordinator::builder()
            .backend(self.backend.clone())
            .upstream(TowerUpstream::new(upstream))
            .upstream_base(self.upstream_base.clone())
            .concurrency_manager(self.concurrency_manager.clone())
            .build();
        ProxyService::new(coordinator).with_cache_status_header(self.cache_status_header.clone())
    }
}

/// Builder for [`ProxyLayer`].
///
/// The backend must be set before `build()` is available.
pub struct ProxyLayerBuilder<B, CM> {
    backend: B,
    upstream_base: String,
    concurrency_manager: CM,
    cache_status_header: HeaderName,
}

impl ProxyLayerBuilder<NotSet, NoopConcurrencyManager> {
    /// Creates a builder targeting the default upstream, without single-flight.
    pub fn new() -> Self {
        Self {
            backend: NotSet,
            upstream_base: DEFAULT_UPSTREAM.to_owned(),
            concurrency_manager: NoopConcurrencyManager,
            cache_status_header: crate::DEFAULT_CACHE_STATUS_HEADER,
        }
    }
}

impl Default for ProxyLayerBuilder<NotSet, NoopConcurrencyManager> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, CM> ProxyLayerBuilder<B, CM> {
    /// Sets the cache backend.
    pub fn backend<NB: CacheBackend>(self, backend: NB) -> ProxyLayerBuilder<NB, CM> {
        ProxyLayerBuilder {
            backend,
            upstream_base: self.upstream_base,
            concurrency_manager: self.concurrency_manager,
            cache_status_header: self.cache_status_header,
        }
    }

    /// Sets the concurrency manager shared by every service the layer creates.
    pub fn concurrency_manager<NCM>(self, concurrency_manager: NCM) -> ProxyLayerBuilder<B, NCM> {
        ProxyLayerBuilder {
            backend: self.backend,
            upstream_base: self.upstream_base,
            concurrency_manager,
            cache_status_header: self.cache_status_header,
        }
    }

    /// Sets the upstream base URI.
    pub fn upstream_base(self, upstream_base: impl Into<String>) -> Self {
        Self {
            upstream_base: upstream_base.into(),
            ..self
        }
    }

    /// Sets the name of the cache status response header.
    pub fn cache_status_header(self, header: HeaderName) -> Self {
        Self {
            cache_status_header: header,
            ..self
        }
    }
}

impl<B, CM> ProxyLayerBuilder<B, CM>
where
    B: CacheBackend,
{
    /// Builds the [`ProxyLayer`].
    pub fn build(self) -> ProxyLayer<B, CM> {
        ProxyLayer {
            backend: self.backend,
            upstream_base: self.upstream_base,
            concurrency_manager: self.concurrency_manager,
            cache_status_header: self.cache_status_header,
        }
    }
}
