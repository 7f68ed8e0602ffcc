use std::sync::Arc;

use fluxcache_core::ModulePathError;
use http::StatusCode;
use thiserror::Error;

/// Type-erased error produced by an upstream client or body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared form of [`BoxError`], so the error can be cloned to coalesced
/// waiters.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Why the upstream could not provide the artifact.
#[derive(Debug, Clone, Error)]
pub enum UpstreamFailure {
    /// The request never produced a response (DNS, connect, TLS, ...).
    #[error("transport error: {0}")]
    Transport(SharedError),
    /// The upstream answered with a status other than `200 OK`.
    #[error("upstream responded with {0}")]
    Status(StatusCode),
}

/// Errors surfaced to the client by the fetch coordinator.
///
/// Storage failures are not part of this enum: they never fail a request.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// The request path could not be decoded into a module path.
    #[error("bad path: {0}")]
    BadPath(#[from] ModulePathError),
    /// The upstream was unreachable or did not answer `200 OK`.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(UpstreamFailure),
    /// The upstream body could not be read to the end.
    #[error("failed to read upstream body: {0}")]
    UpstreamBody(SharedError),
}

impl ProxyError {
    pub(crate) fn transport(error: impl Into<BoxError>) -> Self {
        ProxyError::UpstreamUnavailable(UpstreamFailure::Transport(Arc::from(error.into())))
    }

    pub(crate) fn body(error: impl Into<BoxError>) -> Self {
        ProxyError::UpstreamBody(Arc::from(error.into()))
    }

    /// HTTP status the client receives for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadPath(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short body text the client receives for this error.
    ///
    /// Internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::BadPath(_) => "bad path",
            ProxyError::UpstreamUnavailable(_) => "upstream error",
            ProxyError::UpstreamBody(_) => "read error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_taxonomy() {
        let bad_path = ProxyError::from(ModulePathError::InvalidUtf8);
        assert_eq!(bad_path.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(bad_path.public_message(), "bad path");

        let not_found = ProxyError::UpstreamUnavailable(UpstreamFailure::Status(StatusCode::NOT_FOUND));
        assert_eq!(not_found.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(not_found.public_message(), "upstream error");

        let transport = ProxyError::transport(std::io::Error::other("connection refused"));
        assert_eq!(transport.status_code(), StatusCode::BAD_GATEWAY);

        let body = ProxyError::body(std::io::Error::other("reset"));
        assert_eq!(body.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.public_message(), "read error");
    }

    #[test]
    fn errors_are_cloneable() {
        let err = ProxyError::transport(std::io::Error::other("dns"));
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }
}
