//! Artifact placement under the cache root.

use std::path::{Path, PathBuf};

use fluxcache_core::CacheKey;

/// Where an artifact lives: `<root>/<hex[0:2]>/<hex[2:4]>/<hex>`.
///
/// The two shard levels bound the number of entries per directory to 256
/// subdirectories each. The location is derived from the key every time and
/// never stored.
///
/// ```
/// use std::path::Path;
/// use fluxcache_backend::ArtifactLocation;
/// use fluxcache_core::CacheKey;
///
/// let key = CacheKey::digest(b"abc");
/// let location = ArtifactLocation::new(Path::new("/var/cache/flux"), &key);
/// assert_eq!(
///     location.path(),
///     Path::new("/var/cache/flux/ba/78/ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactLocation {
    path: PathBuf,
}

impl ArtifactLocation {
    /// Computes the location of `key` under `root`.
    pub fn new(root: &Path, key: &CacheKey) -> Self {
        let hex = key.to_hex();
        let path = root.join(&hex[0..2]).join(&hex[2..4]).join(&hex);
        Self { path }
    }

    /// Full path of the artifact file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Second-level shard directory containing the artifact.
    pub fn shard_dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    /// Consumes the location and returns the artifact path.
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for ArtifactLocation {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
