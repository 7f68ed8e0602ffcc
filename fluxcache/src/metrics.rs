//! Metrics declaration and initialization.

use std::time::Duration;

use fluxcache_core::CacheContext;

#[cfg(feature = "metrics")]
use fluxcache_core::{CacheStatus, ResponseSource};
#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fluxcache_cache_hit_total",
            "Total number of requests served from the cache."
        );
        "fluxcache_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fluxcache_cache_miss_total",
            "Total number of requests that missed the cache."
        );
        "fluxcache_cache_miss_total"
    };
    /// Track number of misses answered by another request's fetch.
    pub static ref CACHE_COALESCED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "fluxcache_cache_coalesced_total",
            "Total number of misses that joined an in-flight upstream fetch."
        );
        "fluxcache_cache_coalesced_total"
    };
    /// Track cache read errors.
    pub static ref CACHE_READ_ERRORS: &'static str = {
        metrics::describe_counter!(
            "fluxcache_backend_read_errors_total",
            "Total number of cache reads that failed for a reason other than absence."
        );
        "fluxcache_backend_read_errors_total"
    };
    /// Track cache write errors.
    pub static ref CACHE_WRITE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "fluxcache_backend_write_errors_total",
            "Total number of artifacts that could not be persisted."
        );
        "fluxcache_backend_write_errors_total"
    };
    /// Histogram of request duration.
    pub static ref CACHE_REQUEST_DURATION: &'static str = {
        metrics::describe_histogram!(
            "fluxcache_request_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of proxied requests in seconds."
        );
        "fluxcache_request_duration_seconds"
    };
    /// Histogram of upstream fetch duration.
    pub static ref CACHE_UPSTREAM_HANDLING_HISTOGRAM: &'static str = {
        metrics::describe_histogram!(
            "fluxcache_upstream_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of upstream requests in seconds."
        );
        "fluxcache_upstream_duration_seconds"
    };
}

/// Record metrics from a CacheContext after a request.
///
/// When the `metrics` feature is disabled, this function is a no-op
/// and will be eliminated by the compiler.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_context_metrics(ctx: &CacheContext, duration: Duration) {
    let status = ctx.status.as_str();
    let source = ctx.source.as_str().to_owned();

    metrics::histogram!(
        *CACHE_REQUEST_DURATION,
        "status" => status,
        "source" => source.clone()
    )
    .record(duration.as_secs_f64());

    let counter = match ctx.status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
    };
    metrics::counter!(counter, "source" => source).increment(1);

    if ctx.source == ResponseSource::Coalesced {
        metrics::counter!(*CACHE_COALESCED_COUNTER).increment(1);
    }
    if ctx.read_error {
        metrics::counter!(*CACHE_READ_ERRORS).increment(1);
    }
    if ctx.write_error {
        metrics::counter!(*CACHE_WRITE_ERRORS).increment(1);
    }
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_context_metrics(_ctx: &CacheContext, _duration: Duration) {}

/// Record the duration of one upstream fetch.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_upstream_duration(duration: Duration) {
    metrics::histogram!(*CACHE_UPSTREAM_HANDLING_HISTOGRAM).record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_upstream_duration(_duration: Duration) {}
