//! Cache store for fluxcache.
//!
//! If you want to implement your own storage, you are in the right place.
//!
//! - [`Backend`] - raw keyed byte storage (`read`, `write`)
//! - [`CacheBackend`] - extension trait recording outcomes into a
//!   [`CacheContext`](fluxcache_core::CacheContext)
//! - [`DiskBackend`] - the sharded filesystem store used by the proxy
//! - [`ArtifactLocation`] - where an artifact lives under a cache root
//!
//! Reads are tri-state: `Ok(Some(bytes))` is a hit, `Ok(None)` a miss, and
//! `Err(BackendError)` a storage failure that callers must not confuse with
//! a cold cache.
#![warn(missing_docs)]

mod backend;
mod disk;
mod error;
mod location;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use disk::{DiskBackend, DiskBackendBuilder, NoRoot, WithRoot};
pub use error::BackendError;
pub use location::ArtifactLocation;
