//! Per-request cache context.
//!
//! A [`CacheContext`] is created for every request handled by the fetch
//! coordinator. Backends and the coordinator record what happened into it:
//! whether the artifact was found, where the response came from, and whether
//! the storage medium misbehaved along the way. The tower service turns it
//! into the cache status header; metrics read it after the request.

use crate::label::BackendLabel;

/// Whether the request was answered from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// The artifact was found in the cache.
    Hit,
    /// The artifact was not cached (or could not be read).
    #[default]
    Miss,
}

impl CacheStatus {
    /// Returns the status as a lowercase string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }

    /// Returns the value used in the cache status response header.
    #[inline]
    pub const fn header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Origin of the response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseSource {
    /// Fetched from upstream by this request.
    #[default]
    Upstream,
    /// Fetched from upstream by a concurrent request for the same key and
    /// shared with this one.
    Coalesced,
    /// Read from the cache backend with the given label.
    Backend(BackendLabel),
}

impl ResponseSource {
    /// Returns the source as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            ResponseSource::Upstream => "upstream",
            ResponseSource::Coalesced => "coalesced",
            ResponseSource::Backend(label) => label.as_str(),
        }
    }
}

/// Record of what the cache did for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheContext {
    /// Hit or miss.
    pub status: CacheStatus,
    /// Where the response body came from.
    pub source: ResponseSource,
    /// The cache read failed for a reason other than absence.
    ///
    /// The request was still served (as a miss), but the storage medium
    /// needs attention.
    pub read_error: bool,
    /// Persisting the fetched artifact failed.
    ///
    /// The body was still served; the next request for the same path will
    /// miss again.
    pub write_error: bool,
}

impl CacheContext {
    /// Returns `true` if any storage operation failed during the request.
    pub fn storage_degraded(&self) -> bool {
        self.read_error || self.write_error
    }
}
