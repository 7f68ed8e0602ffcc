//! Error types for backend operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for backend operations.
///
/// Absence of an artifact is not an error: backends report it as `Ok(None)`.
/// Every variant here means the storage medium itself misbehaved.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An existing artifact could not be read.
    #[error("failed to read artifact {}: {source}", .path.display())]
    Read {
        /// Artifact location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A cache directory could not be created.
    #[error("failed to create cache directory {}: {source}", .path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The artifact could not be written.
    #[error("failed to write artifact {}: {source}", .path.display())]
    Write {
        /// Artifact (or temporary file) location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
