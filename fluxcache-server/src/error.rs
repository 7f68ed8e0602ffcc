//! Fatal startup errors.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use fluxcache::ConfigError;
use fluxcache_backend::BackendError;
use thiserror::Error;

/// Errors while assembling the effective configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The config file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Path given with `--config-file`.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The config file is not valid YAML for [`fluxcache::ProxyConfig`].
    #[error("failed to parse config file {}: {message}", path.display())]
    Parse {
        /// Path given with `--config-file`.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// The merged configuration failed validation.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Anything that stops the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The tracing subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Telemetry(String),
    /// The cache root could not be created.
    #[error("failed to prepare cache root: {0}")]
    Backend(#[from] BackendError),
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address from the configuration.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: io::Error,
    },
}
