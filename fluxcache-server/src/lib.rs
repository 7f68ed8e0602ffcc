//! The `fluxcache` server: command line, settings, logging and the accept
//! loop around [`fluxcache_tower::ProxyService`].

pub mod cli;
pub mod error;
pub mod server;
pub mod settings;
pub mod telemetry;

pub use cli::CliArgs;
pub use error::{SettingsError, StartupError};
