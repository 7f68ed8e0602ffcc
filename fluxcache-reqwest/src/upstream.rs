use futures::future::BoxFuture;
use fluxcache_core::{Upstream, UpstreamRequest};
use tracing::trace;

/// Upstream that fetches artifacts with a shared [`reqwest::Client`].
///
/// Cloning is cheap: clones share the client and its connection pool. No
/// timeout and no retry are configured here; pass a pre-configured client to
/// [`ReqwestUpstream::new`] if you need them.
#[derive(Debug, Clone, Default)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    /// Wraps an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl From<reqwest::Client> for ReqwestUpstream {
    fn from(client: reqwest::Client) -> Self {
        Self::new(client)
    }
}

impl Upstream<UpstreamRequest> for ReqwestUpstream {
    type Response = Result<http::Response<reqwest::Body>, reqwest::Error>;
    type Future = BoxFuture<'static, Self::Response>;

    fn call(&mut self, req: UpstreamRequest) -> Self::Future {
        let request = self.client.get(req.uri().to_string());
        Box::pin(async move {
            let response = request.send().await?;
            trace!(status = %response.status(), url = %response.url(), "upstream responded");
            Ok(response.into())
        })
    }
}
