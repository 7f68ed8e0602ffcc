//! Effective configuration: defaults, then the YAML file, then flags and
//! environment variables.

use std::fs;
use std::path::Path;

use fluxcache::ProxyConfig;

use crate::cli::CliArgs;
use crate::error::SettingsError;

/// Builds and validates the configuration the server runs with.
pub fn load(cli: &CliArgs) -> Result<ProxyConfig, SettingsError> {
    let mut config = match cli.config_file.as_deref() {
        Some(path) => read_file(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply_overrides(&mut config);
    Ok(config.validate()?)
}

/// Reads a YAML config file. Missing keys keep their defaults.
pub fn read_file(path: &Path) -> Result<ProxyConfig, SettingsError> {
    let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(ProxyConfig::default());
    }
    serde_saphyr::from_str(&contents).map_err(|err| SettingsError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
