//! Content-addressed cache keys.
//!
//! A [`CacheKey`] is the SHA-256 digest of a module path's raw bytes. It is a
//! pure function of the path: no salt, no clock, no process state, so the same
//! module path maps to the same key across calls and restarts.
//!
//! ```
//! use fluxcache_core::{CacheKey, ModulePath};
//!
//! let a = CacheKey::from_module_path(&ModulePath::new("golang.org/x/text/@v/list"));
//! let b = CacheKey::from_module_path(&ModulePath::new("golang.org/x/text/@v/list"));
//! assert_eq!(a, b);
//! assert_eq!(a.to_hex(), a.to_string());
//! ```

use std::fmt;

use sha2::{Digest, Sha256};

use crate::path::ModulePath;

/// Length of a cache key digest in bytes.
pub const KEY_LEN: usize = 32;

/// SHA-256 digest identifying a cached artifact.
///
/// `CacheKey` is `Copy`; passing it around never allocates. The hexadecimal
/// form is lowercase and 64 characters long.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; KEY_LEN]);

impl CacheKey {
    /// Derives the key of a module path.
    pub fn from_module_path(path: &ModulePath) -> Self {
        Self::digest(path.as_bytes())
    }

    /// Hashes arbitrary bytes into a key.
    pub fn digest(input: &[u8]) -> Self {
        let digest = Sha256::digest(input);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Renders the digest as lowercase hexadecimal.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<&ModulePath> for CacheKey {
    fn from(path: &ModulePath) -> Self {
        Self::from_module_path(path)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheKey").field(&self.to_hex()).finish()
    }
}
