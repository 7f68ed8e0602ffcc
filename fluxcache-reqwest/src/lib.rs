//! Upstream client for fluxcache built on [`reqwest`].
//!
//! [`ReqwestUpstream`] implements [`Upstream`](fluxcache_core::Upstream) for
//! [`UpstreamRequest`](fluxcache_core::UpstreamRequest): it issues a plain GET
//! and hands the response back unbuffered, so the coordinator can decide from
//! the status alone whether the body is worth reading.

mod upstream;

pub use upstream::ReqwestUpstream;
