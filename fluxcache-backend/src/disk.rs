//! Sharded filesystem backend.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fluxcache_core::{BackendLabel, CacheKey, ModulePath, Raw};
use tracing::{debug, trace};

use crate::location::ArtifactLocation;
use crate::{Backend, BackendError, BackendResult, CacheBackend};

const TEMP_SUFFIX: &str = ".tmp";

/// Filesystem-backed artifact store.
///
/// Each artifact is a regular file whose content is the raw upstream body,
/// stored at the [`ArtifactLocation`] of its key. There is no index and no
/// metadata file: presence of the file is the cache entry.
///
/// With atomic writes enabled (the default) a write goes to a uniquely named
/// temporary file in the shard directory and is renamed into place, so a
/// concurrent reader sees either no file or the complete artifact.
///
/// # Examples
///
/// ```no_run
/// use fluxcache_backend::DiskBackend;
///
/// let backend = DiskBackend::builder()
///     .root("/var/cache/fluxcache")
///     .build()
///     .expect("cache root must be creatable");
/// ```
#[derive(Debug, Clone)]
pub struct DiskBackend {
    root: Arc<PathBuf>,
    atomic_writes: bool,
    label: BackendLabel,
}

impl DiskBackend {
    /// Creates a new builder for `DiskBackend`.
    pub fn builder() -> DiskBackendBuilder<NoRoot> {
        DiskBackendBuilder::new()
    }

    /// Returns the cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the location an artifact with this key occupies.
    pub fn location(&self, key: &CacheKey) -> ArtifactLocation {
        ArtifactLocation::new(&self.root, key)
    }

    /// Returns the location of the artifact cached for a module path.
    pub fn locate(&self, path: &ModulePath) -> ArtifactLocation {
        self.location(&CacheKey::from_module_path(path))
    }

    async fn write_atomic(&self, location: ArtifactLocation, value: Raw) -> BackendResult<()> {
        // The whole temp-write-rename runs on one blocking task, so dropping
        // this future cannot strand a half-written temporary file.
        let path = location.path().to_path_buf();
        tokio::task::spawn_blocking(move || persist_atomically(&location, &value))
            .await
            .map_err(|join| BackendError::Write {
                path,
                source: io::Error::other(join),
            })?
    }
}

#[async_trait]
impl Backend for DiskBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        let location = self.location(key);
        match tokio::fs::read(location.path()).await {
            Ok(bytes) => {
                trace!(path = %location.path().display(), size = bytes.len(), "artifact read");
                Ok(Some(Raw::from(bytes)))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BackendError::Read {
                path: location.into_path_buf(),
                source,
            }),
        }
    }

    async fn write(&self, key: &CacheKey, value: Raw) -> BackendResult<()> {
        let location = self.location(key);
        let shard = location.shard_dir();
        tokio::fs::create_dir_all(shard)
            .await
            .map_err(|source| BackendError::CreateDir {
                path: shard.to_path_buf(),
                source,
            })?;

        let path = location.path().to_path_buf();
        let size = value.len();
        if self.atomic_writes {
            self.write_atomic(location, value).await?;
        } else {
            tokio::fs::write(location.path(), &value)
                .await
                .map_err(|source| BackendError::Write {
                    path: location.path().to_path_buf(),
                    source,
                })?;
        }
        debug!(path = %path.display(), size, "artifact stored");
        Ok(())
    }

    fn label(&self) -> BackendLabel {
        self.label.clone()
    }
}

impl CacheBackend for DiskBackend {}

/// Writes `value` to a fresh temporary file in the shard directory and
/// renames it onto the artifact. The temporary file is unlinked on every
/// path that does not end in a successful rename.
fn persist_atomically(location: &ArtifactLocation, value: &[u8]) -> BackendResult<()> {
    let shard = location.shard_dir();
    let prefix = location
        .path()
        .file_name()
        .map(|name| format!(".{}.", name.to_string_lossy()))
        .unwrap_or_else(|| ".".to_owned());
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(shard)
        .map_err(|source| BackendError::Write {
            path: shard.to_path_buf(),
            source,
        })?;

    temp.write_all(value)
        .map_err(|source| BackendError::Write {
            path: temp.path().to_path_buf(),
            source,
        })?;

    temp.persist(location.path())
        .map_err(|err| BackendError::Write {
            path: location.path().to_path_buf(),
            source: err.error,
        })?;
    Ok(())
}

/// Marker type: the cache root has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoot;

/// Marker type: the cache root has been configured.
#[derive(Debug, Clone)]
pub struct WithRoot(PathBuf);

/// Builder for [`DiskBackend`].
///
/// `build()` is only available once [`root`](Self::root) has been set.
#[derive(Debug, Clone)]
pub struct DiskBackendBuilder<R = NoRoot> {
    root: R,
    atomic_writes: bool,
    label: BackendLabel,
}

impl DiskBackendBuilder<NoRoot> {
    /// Creates a builder with atomic writes enabled and the `disk` label.
    pub fn new() -> Self {
        Self {
            root: NoRoot,
            atomic_writes: true,
            label: BackendLabel::new_static("disk"),
        }
    }
}

impl Default for DiskBackendBuilder<NoRoot> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> DiskBackendBuilder<R> {
    /// Sets the cache root directory.
    pub fn root(self, root: impl Into<PathBuf>) -> DiskBackendBuilder<WithRoot> {
        DiskBackendBuilder {
            root: WithRoot(root.into()),
            atomic_writes: self.atomic_writes,
            label: self.label,
        }
    }

    /// Enables or disables write-to-temp-then-rename.
    ///
    /// Without it a reader racing a writer may observe a partially written
    /// artifact.
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }

    /// Sets the label reported as the response source on a hit.
    pub fn label(mut self, label: impl Into<BackendLabel>) -> Self {
        self.label = label.into();
        self
    }
}

impl DiskBackendBuilder<WithRoot> {
    /// Creates the cache root if needed and builds the backend.
    ///
    /// Shard directories are created lazily on first write.
    pub fn build(self) -> Result<DiskBackend, BackendError> {
        let WithRoot(root) = self.root;
        std::fs::create_dir_all(&root).map_err(|source| BackendError::CreateDir {
            path: root.clone(),
            source,
        })?;
        Ok(DiskBackend {
            root: Arc::new(root),
            atomic_writes: self.atomic_writes,
            label: self.label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let key = CacheKey::digest(b"github.com/foo/bar/@v/list");
        let location = ArtifactLocation::new(dir.path(), &key);
        // A non-empty directory cannot be replaced by a file.
        std::fs::create_dir_all(location.path().join("occupied")).unwrap();

        let err = persist_atomically(&location, b"v1.0.0\n").unwrap_err();
        assert!(matches!(err, BackendError::Write { .. }));

        let leftovers: Vec<_> = std::fs::read_dir(location.shard_dir())
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty(), "temporary files left: {leftovers:?}");
    }

    #[test]
    fn build_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("cache");
        let backend = DiskBackend::builder().root(&root).build().unwrap();
        assert!(root.is_dir());
        assert_eq!(backend.root(), root);
        assert_eq!(backend.label().as_str(), "disk");
    }

    #[test]
    fn build_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let err = DiskBackend::builder().root(&file).build().unwrap_err();
        assert!(matches!(err, BackendError::CreateDir { .. }));
    }
}
