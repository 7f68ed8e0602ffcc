//! Incoming request descriptor.

use http::{Method, Uri};

/// What the fetch coordinator needs to know about an incoming request.
///
/// The path is kept raw (percent-encoded): it is decoded into a
/// [`ModulePath`](crate::ModulePath) for the cache key, and forwarded as-is
/// to the upstream on a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    method: Method,
    path: String,
    query: Option<String>,
}

impl ProxyRequest {
    /// Creates a request descriptor from its parts.
    pub fn new(method: Method, path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query,
        }
    }

    /// Creates a `GET` descriptor for the given raw path.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path, None)
    }

    /// Extracts method, path and raw query from a request line.
    pub fn from_uri(method: Method, uri: &Uri) -> Self {
        Self {
            method,
            path: uri.path().to_owned(),
            query: uri.query().map(ToOwned::to_owned),
        }
    }

    /// Sets the raw query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Returns the request method.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the raw, percent-encoded request path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string, if any.
    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

impl<B> From<&http::Request<B>> for ProxyRequest {
    fn from(request: &http::Request<B>) -> Self {
        Self::from_uri(request.method().clone(), request.uri())
    }
}
