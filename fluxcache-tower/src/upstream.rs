//! Upstream adapter for Tower HTTP clients.
//!
//! [`TowerUpstream`] implements the [`Upstream`] trait for any Tower service
//! that takes a bodiless `http::Request`, such as a `hyper-util` client or a
//! `service_fn` in tests. The coordinator calls it on cache misses.

use bytes::Bytes;
use fluxcache_core::{Upstream, UpstreamRequest};
use http::{Request, Response};
use http_body_util::Empty;
use tower::util::Oneshot;
use tower::{Service, ServiceExt};

/// Adapter that implements fluxcache's [`Upstream`] trait for Tower services.
///
/// Every call clones the service and drives it with
/// [`oneshot`](ServiceExt::oneshot), which waits for readiness before
/// sending the request.
#[derive(Debug, Clone)]
pub struct TowerUpstream<S> {
    service: S,
}

impl<S> TowerUpstream<S> {
    /// Creates a new upstream adapter wrapping the given service.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Returns the wrapped service.
    pub fn into_inner(self) -> S {
        self.service
    }
}

impl<S, ResBody> Upstream<UpstreamRequest> for TowerUpstream<S>
where
    S: Service<Request<Empty<Bytes>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Result<Response<ResBody>, S::Error>;
    type Future = Oneshot<S, Request<Empty<Bytes>>>;

    fn call(&mut self, req: UpstreamRequest) -> Self::Future {
        let mut request = Request::new(Empty::new());
        *request.uri_mut() = req.into_uri();
        self.service.clone().oneshot(request)
    }
}
