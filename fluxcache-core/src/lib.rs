#![warn(missing_docs)]
//! # fluxcache-core
//!
//! Core types shared by every fluxcache crate.
//!
//! The proxy answers module-fetch requests (`GET /<module path>`) from a local
//! cache and falls back to an upstream registry on a miss. This crate holds the
//! protocol-level vocabulary of that exchange, without any storage or network
//! code:
//!
//! - [`ModulePath`] - the percent-decoded request path, pre-image of the cache key
//! - [`CacheKey`] - SHA-256 digest of a module path
//! - [`ProxyRequest`] / [`ProxyResponse`] - what the proxy consumes and produces
//! - [`Upstream`] / [`UpstreamRequest`] - the injected upstream-fetch capability
//! - [`CacheContext`] - per-request record of what the cache did
//!
//! ```
//! use fluxcache_core::{CacheKey, ModulePath};
//!
//! let path = ModulePath::from_request_path("/github.com/foo/bar/@v/list").unwrap();
//! assert_eq!(path.as_str(), "github.com/foo/bar/@v/list");
//!
//! let key = CacheKey::from_module_path(&path);
//! assert_eq!(key.to_hex().len(), 64);
//! ```

pub mod context;
pub mod key;
pub mod label;
pub mod path;
pub mod request;
pub mod response;
pub mod upstream;

pub use context::{CacheContext, CacheStatus, ResponseSource};
pub use key::CacheKey;
pub use label::BackendLabel;
pub use path::{ModulePath, ModulePathError};
pub use request::ProxyRequest;
pub use response::ProxyResponse;
pub use upstream::{Upstream, UpstreamRequest};

/// Raw artifact bytes.
/// Using `Bytes` keeps clones of cached bodies reference counted.
pub type Raw = bytes::Bytes;
