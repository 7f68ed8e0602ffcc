//! Outgoing response descriptor.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

/// A fully buffered response: status, headers and body.
///
/// On a miss this is a byte-faithful copy of the upstream response. On a hit
/// it is built by [`ProxyResponse::from_artifact`] and carries only the
/// headers derivable from the artifact itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ProxyResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Builds the `200 OK` response for a cached artifact.
    ///
    /// `file_name` is the last segment of the module path. Its extension picks
    /// the `Content-Type`; when it says nothing the body is sniffed.
    ///
    /// ```
    /// use bytes::Bytes;
    /// use fluxcache_core::ProxyResponse;
    ///
    /// let response = ProxyResponse::from_artifact(Bytes::from_static(b"PK\x03\x04"), Some("v1.0.0.zip"));
    /// assert_eq!(response.status(), http::StatusCode::OK);
    /// assert_eq!(response.headers()["content-type"], "application/zip");
    /// assert_eq!(response.headers()["content-length"], "4");
    /// ```
    pub fn from_artifact(body: Bytes, file_name: Option<&str>) -> Self {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(CONTENT_TYPE, content_type(file_name, &body));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        Self {
            status: StatusCode::OK,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a mutable reference to the response headers.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body bytes.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Splits the response into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

/// Picks a content type for an artifact.
///
/// The module protocol's own extensions come first (`.info` is JSON, `.mod`
/// is a text go.mod file, `.zip` a module archive), then the generic
/// extension table, then sniffing.
pub fn content_type(file_name: Option<&str>, body: &[u8]) -> HeaderValue {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, extension)| extension.to_ascii_lowercase());

    let by_extension = match extension.as_deref() {
        Some("info") => Some("application/json".to_owned()),
        Some("mod") => Some(TEXT_PLAIN.to_owned()),
        Some("zip") => Some("application/zip".to_owned()),
        Some(_) => file_name
            .and_then(|name| mime_guess::from_path(name).first())
            .map(|mime| mime.to_string()),
        None => None,
    };

    by_extension
        .and_then(|mime| HeaderValue::from_str(&mime).ok())
        .unwrap_or_else(|| HeaderValue::from_static(sniff(body)))
}

fn sniff(body: &[u8]) -> &'static str {
    let Ok(text) = std::str::from_utf8(body) else {
        return OCTET_STREAM;
    };
    let binary = text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c'));
    if binary { OCTET_STREAM } else { TEXT_PLAIN }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_protocol_extensions() {
        assert_eq!(content_type(Some("v1.0.0.info"), b"{}"), "application/json");
        assert_eq!(content_type(Some("v1.0.0.mod"), b"module x"), TEXT_PLAIN);
        assert_eq!(content_type(Some("v1.0.0.zip"), b"PK"), "application/zip");
    }

    #[test]
    fn list_is_sniffed_as_text() {
        assert_eq!(content_type(Some("list"), b"v1.0.0\nv1.1.0\n"), TEXT_PLAIN);
    }

    #[test]
    fn binary_without_extension() {
        assert_eq!(content_type(Some("blob"), &[0u8, 159, 146, 150]), OCTET_STREAM);
        assert_eq!(content_type(None, &[1u8, 2, 3]), OCTET_STREAM);
    }

    #[test]
    fn generic_extension_table() {
        assert_eq!(content_type(Some("index.html"), b""), "text/html");
    }

    #[test]
    fn artifact_response_has_no_upstream_headers() {
        let response = ProxyResponse::from_artifact(Bytes::from_static(b"v1.0.0\n"), Some("list"));
        assert_eq!(response.headers().len(), 2);
        assert_eq!(response.body(), &Bytes::from_static(b"v1.0.0\n"));
    }
}
