//! Module path decoding.
//!
//! A module path is the logical identifier of a requested resource. It is
//! taken from the request path with one leading slash stripped and
//! percent-escapes decoded, e.g. `/github.com/%21azure/sdk/@v/list` becomes
//! `github.com/!azure/sdk/@v/list`.
//!
//! Decoding is strict: a `%` that is not followed by two hex digits is an
//! error rather than a literal percent sign.

use std::fmt;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Errors produced while decoding a request path into a [`ModulePath`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModulePathError {
    /// A `%` was not followed by two hexadecimal digits.
    #[error("invalid percent-escape {escape:?} at byte {offset}")]
    InvalidEscape {
        /// Byte offset of the `%` inside the (slash-stripped) path.
        offset: usize,
        /// The offending escape sequence, as far as it could be read.
        escape: String,
    },
    /// The decoded bytes do not form valid UTF-8.
    #[error("decoded module path is not valid UTF-8")]
    InvalidUtf8,
}

/// A percent-decoded module path.
///
/// The raw bytes of this string are the pre-image of the
/// [`CacheKey`](crate::CacheKey).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(String);

impl ModulePath {
    /// Creates a module path from an already decoded string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Decodes the path component of an incoming request.
    ///
    /// One leading `/` is stripped, then percent-escapes are decoded.
    ///
    /// ```
    /// use fluxcache_core::ModulePath;
    ///
    /// let path = ModulePath::from_request_path("/golang.org/x/text/@v/v0.3.0.mod").unwrap();
    /// assert_eq!(path.as_str(), "golang.org/x/text/@v/v0.3.0.mod");
    ///
    /// assert!(ModulePath::from_request_path("/bad%zzpath").is_err());
    /// ```
    pub fn from_request_path(path: &str) -> Result<Self, ModulePathError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        validate_escapes(trimmed)?;
        let decoded = percent_decode_str(trimmed)
            .decode_utf8()
            .map_err(|_| ModulePathError::InvalidUtf8)?;
        Ok(Self(decoded.into_owned()))
    }

    /// Returns the path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the raw bytes of the path.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns the last non-empty path segment, used as a filename hint.
    ///
    /// ```
    /// use fluxcache_core::ModulePath;
    ///
    /// let path = ModulePath::new("github.com/foo/bar/@v/v1.0.0.zip");
    /// assert_eq!(path.file_name(), Some("v1.0.0.zip"));
    /// assert_eq!(ModulePath::new("").file_name(), None);
    /// ```
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModulePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate_escapes(raw: &str) -> Result<(), ModulePathError> {
    let bytes = raw.as_bytes();
    let mut offset = 0;
    while offset < bytes.len() {
        if bytes[offset] != b'%' {
            offset += 1;
            continue;
        }
        let valid = bytes
            .get(offset + 1..offset + 3)
            .is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let end = (offset + 3).min(bytes.len());
            return Err(ModulePathError::InvalidEscape {
                offset,
                escape: String::from_utf8_lossy(&bytes[offset..end]).into_owned(),
            });
        }
        offset += 3;
    }
    Ok(())
}
