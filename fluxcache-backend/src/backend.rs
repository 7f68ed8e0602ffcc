use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use fluxcache_core::{BackendLabel, CacheContext, CacheKey, CacheStatus, Raw, ResponseSource};

use crate::BackendError;

/// Result of a backend operation.
pub type BackendResult<T> = Result<T, BackendError>;

/// Low-level artifact store.
///
/// `read` distinguishes three outcomes: `Ok(Some(_))` for a stored artifact,
/// `Ok(None)` for absence, and `Err(_)` when the medium failed. A `write`
/// that returns `Ok` makes the full artifact visible to every later `read`
/// of the same key.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Reads the artifact stored under `key`, if any.
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>>;

    /// Stores `value` under `key`, replacing any previous artifact.
    async fn write(&self, key: &CacheKey, value: Raw) -> BackendResult<()>;

    /// Returns the label reported as the response source on a hit.
    fn label(&self) -> BackendLabel {
        BackendLabel::new_static("backend")
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend> {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<Raw>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: Raw) -> BackendResult<()> {
        (**self).write(key, value).await
    }

    fn label(&self) -> BackendLabel {
        (**self).label()
    }
}

/// Cache-level operations that record their outcome into a [`CacheContext`].
///
/// The result is still returned to the caller; the context only keeps track
/// of what happened so the response layer and metrics can report it.
pub trait CacheBackend: Backend {
    /// [`Backend::read`], marking a hit or a read error in `ctx`.
    fn get(
        &self,
        key: &CacheKey,
        ctx: &mut CacheContext,
    ) -> impl Future<Output = BackendResult<Option<Raw>>> + Send {
        async move {
            let result = self.read(key).await;
            match &result {
                Ok(Some(_)) => {
                    ctx.status = CacheStatus::Hit;
                    ctx.source = ResponseSource::Backend(self.label());
                }
                Ok(None) => {}
                Err(_) => ctx.read_error = true,
            }
            result
        }
    }

    /// [`Backend::write`], marking a write error in `ctx`.
    fn set(
        &self,
        key: &CacheKey,
        value: Raw,
        ctx: &mut CacheContext,
    ) -> impl Future<Output = BackendResult<()>> + Send {
        async move {
            let result = self.write(key, value).await;
            if result.is_err() {
                ctx.write_error = true;
            }
            result
        }
    }
}

impl CacheBackend for Arc<dyn Backend> {}
