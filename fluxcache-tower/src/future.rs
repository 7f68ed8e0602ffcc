use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use fluxcache::FetchOutcome;
use fluxcache_core::CacheContext;
use futures::Future;
use futures::ready;
use http::{HeaderName, Response};
use http_body_util::Full;
use pin_project::pin_project;
use tracing::debug;

use crate::response::render;

/// Wrapper future that renders the coordinator outcome as an HTTP response.
///
/// This future wraps the coordinator's request future and adds the cache
/// status header, or turns the error into a plain-text response.
#[pin_project]
pub struct ProxyServiceFuture<F>
where
    F: Future<Output = (FetchOutcome, CacheContext)>,
{
    #[pin]
    inner: F,
    cache_status_header: Option<HeaderName>,
}

impl<F> ProxyServiceFuture<F>
where
    F: Future<Output = (FetchOutcome, CacheContext)>,
{
    /// Creates a new future wrapping the coordinator future.
    pub fn new(inner: F, cache_status_header: HeaderName) -> Self {
        Self {
            inner,
            cache_status_header: Some(cache_status_header),
        }
    }
}

impl<F> Future for ProxyServiceFuture<F>
where
    F: Future<Output = (FetchOutcome, CacheContext)>,
{
    type Output = Result<Response<Full<Bytes>>, Infallible>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let (outcome, ctx) = ready!(this.inner.poll(cx));

        if let Err(error) = &outcome {
            debug!(status = %error.status_code(), %error, "request failed");
        }
        let header = this
            .cache_status_header
            .take()
            .unwrap_or(crate::DEFAULT_CACHE_STATUS_HEADER);
        Poll::Ready(Ok(render(outcome, &ctx, &header)))
    }
}
