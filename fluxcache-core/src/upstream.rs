//! The upstream-fetch capability.

use std::fmt;
use std::future::Future;

use http::Uri;
use http::uri::InvalidUri;

/// Trait for calling the upstream registry on a cache miss.
///
/// The trait is framework-agnostic: the reqwest and tower integrations
/// implement it, and tests can implement it with a plain struct.
///
/// # Examples
///
/// ```rust,ignore
/// use fluxcache_core::{Upstream, UpstreamRequest};
/// use std::future::Ready;
///
/// #[derive(Clone)]
/// struct StaticUpstream;
///
/// impl Upstream<UpstreamRequest> for StaticUpstream {
///     type Response = Result<http::Response<String>, std::convert::Infallible>;
///     type Future = Ready<Self::Response>;
///
///     fn call(&mut self, _req: UpstreamRequest) -> Self::Future {
///         std::future::ready(Ok(http::Response::new("{}".to_owned())))
///     }
/// }
/// ```
pub trait Upstream<Req> {
    /// The response type returned by the upstream service
    type Response;

    /// The future that resolves to the response
    type Future: Future<Output = Self::Response> + Send;

    /// Call the upstream service with the given request
    fn call(&mut self, req: Req) -> Self::Future;
}

/// A GET request to the upstream registry.
///
/// The target is `<base><path>` followed by `?<query>` when the incoming
/// request carried a non-empty query string. The path is the original,
/// still percent-encoded request path, so the upstream sees exactly what the
/// client asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    uri: Uri,
}

impl UpstreamRequest {
    /// Builds the upstream target from its three parts.
    ///
    /// An empty query appends nothing, not even a bare `?`, so `/x/@v/list?`
    /// and `/x/@v/list` produce the same upstream target.
    ///
    /// ```
    /// use fluxcache_core::UpstreamRequest;
    ///
    /// let req = UpstreamRequest::build(
    ///     "https://proxy.golang.org",
    ///     "/github.com/foo/bar/@v/list",
    ///     Some("go-get=1"),
    /// )
    /// .unwrap();
    /// assert_eq!(
    ///     req.uri().to_string(),
    ///     "https://proxy.golang.org/github.com/foo/bar/@v/list?go-get=1"
    /// );
    ///
    /// let bare = UpstreamRequest::build("https://proxy.golang.org", "/x/@v/list", Some("")).unwrap();
    /// assert_eq!(bare.uri().to_string(), "https://proxy.golang.org/x/@v/list");
    /// ```
    pub fn build(base: &str, path: &str, query: Option<&str>) -> Result<Self, InvalidUri> {
        let query = query.filter(|query| !query.is_empty());
        let mut target =
            String::with_capacity(base.len() + path.len() + query.map_or(0, |q| q.len() + 1));
        target.push_str(base);
        target.push_str(path);
        if let Some(query) = query {
            target.push('?');
            target.push_str(query);
        }
        Ok(Self {
            uri: Uri::try_from(target)?,
        })
    }

    /// Returns the target URI.
    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Consumes the request and returns the target URI.
    #[inline]
    pub fn into_uri(self) -> Uri {
        self.uri
    }
}

impl fmt::Display for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.uri.fmt(f)
    }
}
