use bytes::Bytes;
use fluxcache::{FetchOutcome, ProxyError};
use fluxcache_core::CacheContext;
use http::header::{CONNECTION, CONTENT_TYPE, HeaderName, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, Response};
use http_body_util::Full;

/// Connection-scoped headers that must not be forwarded.
///
/// The body is fully buffered and re-framed, so the upstream's framing and
/// connection management headers no longer describe it.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Turns a coordinator outcome into the response sent to the client.
///
/// Successful responses get the cache status header; errors become a short
/// plain-text body.
pub fn render(
    outcome: FetchOutcome,
    ctx: &CacheContext,
    cache_status_header: &HeaderName,
) -> Response<Full<Bytes>> {
    match outcome {
        Ok(proxy_response) => {
            let (status, mut headers, body) = proxy_response.into_parts();
            strip_hop_by_hop(&mut headers);
            headers.insert(
                cache_status_header.clone(),
                HeaderValue::from_static(ctx.status.header_value()),
            );

            let mut response = Response::new(Full::new(body));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(error) => error_response(&error),
    }
}

/// Plain-text response for a client-facing error.
pub fn error_response(error: &ProxyError) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        error.public_message().as_bytes(),
    )));
    *response.status_mut() = error.status_code();
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// Removes hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
