use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use fluxcache::{BoxError, ConcurrencyManager, FetchCoordinator, FetchOutcome};
use fluxcache_backend::CacheBackend;
use fluxcache_core::{CacheContext, ProxyRequest, Upstream, UpstreamRequest};
use futures::future::BoxFuture;
use http::{HeaderName, Request, Response};
use http_body::Body;
use tower::Service;

use crate::future::ProxyServiceFuture;

/// Tower service answering module-fetch requests.
///
/// The request body and method are ignored; the path and query select the
/// artifact. Clones share the coordinator, and with it the backend, the
/// upstream and the in-flight registry.
pub struct ProxyService<B, U, CM> {
    coordinator: Arc<FetchCoordinator<B, U, CM>>,
    cache_status_header: HeaderName,
}

impl<B, U, CM> ProxyService<B, U, CM> {
    /// Creates a service around a coordinator.
    pub fn new(coordinator: FetchCoordinator<B, U, CM>) -> Self {
        Self::from_shared(Arc::new(coordinator))
    }

    /// Creates a service around an already shared coordinator.
    pub fn from_shared(coordinator: Arc<FetchCoordinator<B, U, CM>>) -> Self {
        Self {
            coordinator,
            cache_status_header: crate::DEFAULT_CACHE_STATUS_HEADER,
        }
    }

    /// Sets the name of the cache status response header.
    pub fn with_cache_status_header(mut self, header: HeaderName) -> Self {
        self.cache_status_header = header;
        self
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &Arc<FetchCoordinator<B, U, CM>> {
        &self.coordinator
    }
}

impl<B, U, CM> Clone for ProxyService<B, U, CM> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            cache_status_header: self.cache_status_header.clone(),
        }
    }
}

impl<B, U, CM> fmt::Debug for ProxyService<B, U, CM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyService")
            .field("coordinator", &self.coordinator)
            .field("cache_status_header", &self.cache_status_header)
            .finish()
    }
}

impl<B, U, CM, ReqBody, ResBody, E> Service<Request<ReqBody>> for ProxyService<B, U, CM>
where
    B: CacheBackend + Send + Sync + 'static,
    U: Upstream<UpstreamRequest, Response = Result<Response<ResBody>, E>>
        + Clone
        + Send
        + Sync
        + 'static,
    CM: ConcurrencyManager<FetchOutcome> + 'static,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
    E: Into<BoxError> + Send + 'static,
{
    type Response = Response<http_body_util::Full<bytes::Bytes>>;
    type Error = Infallible;
    type Future = ProxyServiceFuture<BoxFuture<'static, (FetchOutcome, CacheContext)>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let request = ProxyRequest::from(&req);
        let coordinator = Arc::clone(&self.coordinator);
        let inner: BoxFuture<'static, _> =
            Box::pin(async move { coordinator.handle(request).await });
        ProxyServiceFuture::new(inner, self.cache_status_header.clone())
    }
}
