#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # fluxcache
//!
//! A caching reverse proxy for module-fetch requests.
//!
//! A request for `/<module path>` is answered from a local cache when the
//! artifact is present; otherwise the request is forwarded to an upstream
//! registry, and a successful body is persisted before being returned.
//! Cached artifacts are immutable and never revalidated.
//!
//! This crate holds the protocol-agnostic part of the proxy:
//!
//! - [`FetchCoordinator`] - the per-request flow (decode, look up, fetch, persist)
//! - [`concurrency`] - single-flight for concurrent misses on the same key
//! - [`ProxyConfig`] - runtime settings
//! - [`ProxyError`] - what a client can be told went wrong
//!
//! HTTP serving lives in `fluxcache-tower`, the default upstream client in
//! `fluxcache-reqwest`, and storage in `fluxcache-backend`.

/// Backend-related re-exports.
///
/// This module provides access to the [`Backend`](fluxcache_backend::Backend)
/// trait and the filesystem store for callers that only depend on this crate.
pub mod backend {
    pub use fluxcache_backend::{
        ArtifactLocation, Backend, BackendError, BackendResult, CacheBackend, DiskBackend,
        DiskBackendBuilder,
    };
}

/// Dogpile prevention via concurrency management.
///
/// [`BroadcastConcurrencyManager`](concurrency::BroadcastConcurrencyManager)
/// lets one request per key reach the upstream while the others wait for its
/// outcome.
pub mod concurrency;

/// Runtime configuration.
pub mod config;

/// Request orchestration.
pub mod coordinator;

/// Error types surfaced to clients.
pub mod error;

/// Metrics collection for cache observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for hits, misses, coalesced requests, storage errors and
/// request and upstream latency.
pub mod metrics;

pub use concurrency::{
    BroadcastConcurrencyManager, ConcurrencyDecision, ConcurrencyError, ConcurrencyManager,
    NoopConcurrencyManager,
};
pub use config::{ConfigError, ProxyConfig, ProxyConfigBuilder};
pub use coordinator::{FetchCoordinator, FetchCoordinatorBuilder, FetchOutcome, NotSet};
pub use error::{BoxError, ProxyError, SharedError, UpstreamFailure};

pub use fluxcache_core::{
    BackendLabel, CacheContext, CacheKey, CacheStatus, ModulePath, ModulePathError, ProxyRequest,
    ProxyResponse, Raw, ResponseSource, Upstream, UpstreamRequest,
};
