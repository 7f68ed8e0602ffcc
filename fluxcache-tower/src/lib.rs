//! Tower integration for the fluxcache module proxy.
//!
//! [`ProxyService`] is a Tower [`Service`](tower::Service) that answers
//! module-fetch requests through a [`FetchCoordinator`]. Every outcome,
//! including upstream failures and undecodable paths, becomes an HTTP
//! response, so the service error type is [`Infallible`](std::convert::Infallible)
//! and the service can be handed directly to a hyper connection.
//!
//! [`ProxyLayer`] wraps an HTTP client service (anything implementing
//! `Service<Request<Empty<Bytes>>>`) into a `ProxyService` that uses it as the
//! upstream.
//!
//! # Response Headers
//!
//! Successful responses carry a cache status header:
//!
//! | Header Value | Meaning |
//! |--------------|---------|
//! | `HIT` | Artifact served from the cache |
//! | `MISS` | Artifact fetched from upstream (and stored for future requests) |
//!
//! The default header name is `x-cache-status`. Customize it with
//! [`ProxyLayerBuilder::cache_status_header`] or
//! [`ProxyService::with_cache_status_header`].
//!
//! Error responses are plain text: `bad path` (400), `upstream error` (502)
//! or `read error` (500).
//!
//! [`FetchCoordinator`]: fluxcache::FetchCoordinator

#![warn(missing_docs)]

/// Future type for the proxy service.
pub mod future;
/// Tower layer and builder.
pub mod layer;
/// Rendering of coordinator outcomes as HTTP responses.
pub mod response;
/// The Tower service answering module-fetch requests.
pub mod service;
/// Upstream adapter for Tower HTTP clients.
pub mod upstream;

use http::HeaderName;

/// Default header name for cache status (HIT/MISS).
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

pub use layer::{ProxyLayer, ProxyLayerBuilder};
pub use service::ProxyService;
pub use upstream::TowerUpstream;

pub use fluxcache::{BroadcastConcurrencyManager, NoopConcurrencyManager, NotSet};
