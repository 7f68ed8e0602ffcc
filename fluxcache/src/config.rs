//! Runtime configuration of the proxy.
//!
//! [`ProxyConfig`] is fixed at startup and handed to constructors. It can be
//! deserialized from a config file (all fields optional, missing ones take
//! their defaults) or assembled with [`ProxyConfig::builder`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use http::Uri;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cache root, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "./fluxcache";
/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default upstream registry.
pub const DEFAULT_UPSTREAM: &str = "https://proxy.golang.org";

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The upstream base is not an absolute `http`/`https` URI.
    #[error("invalid upstream {upstream:?}: {reason}")]
    InvalidUpstream {
        /// The configured value.
        upstream: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Port 0 asks the OS for a random port, which nobody could connect to.
    #[error("port must be non-zero")]
    InvalidPort,
}

/// Proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Cache root directory.
    pub cache_dir: PathBuf,
    /// Address to listen on.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Base URI of the upstream registry, without trailing slash.
    pub upstream: String,
    /// Debug-level logging for the proxy crates.
    pub verbose: bool,
    /// JSON log output.
    pub log_json: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            upstream: DEFAULT_UPSTREAM.to_owned(),
            verbose: false,
            log_json: false,
        }
    }
}

impl ProxyConfig {
    /// Creates a builder seeded with the defaults.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Socket address the server binds.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Checks the settings and normalizes the upstream base.
    ///
    /// ```
    /// use fluxcache::ProxyConfig;
    ///
    /// let config = ProxyConfig {
    ///     upstream: "https://goproxy.example.com/".to_owned(),
    ///     ..ProxyConfig::default()
    /// }
    /// .validate()
    /// .unwrap();
    /// assert_eq!(config.upstream, "https://goproxy.example.com");
    /// ```
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        self.upstream = normalize_upstream(&self.upstream)?;
        Ok(self)
    }
}

fn normalize_upstream(upstream: &str) -> Result<String, ConfigError> {
    let invalid = |reason| ConfigError::InvalidUpstream {
        upstream: upstream.to_owned(),
        reason,
    };

    let uri: Uri = upstream.parse().map_err(|_| invalid("not a valid URI"))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(_) => return Err(invalid("scheme must be http or https")),
        None => return Err(invalid("URI must be absolute")),
    }
    if uri.authority().is_none() {
        return Err(invalid("URI has no host"));
    }
    if uri.query().is_some() {
        return Err(invalid("URI must not carry a query"));
    }
    Ok(upstream.trim_end_matches('/').to_owned())
}

/// Builder for [`ProxyConfig`].
///
/// Unset fields keep their defaults; [`build`](Self::build) validates.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    /// Sets the cache root directory.
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = cache_dir.into();
        self
    }

    /// Sets the listening address.
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    /// Sets the listening port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the upstream base URI.
    pub fn upstream(mut self, upstream: impl Into<String>) -> Self {
        self.config.upstream = upstream.into();
        self
    }

    /// Enables debug logging.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Enables JSON log output.
    pub fn log_json(mut self, log_json: bool) -> Self {
        self.config.log_json = log_json;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ProxyConfig, ConfigError> {
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = ProxyConfig::builder().build().unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("./fluxcache"));
        assert_eq!(config.listen_addr(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.upstream, "https://proxy.golang.org");
        assert!(!config.verbose);
        assert!(!config.log_json);
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let config = ProxyConfig::builder()
            .upstream("http://127.0.0.1:3000//")
            .build()
            .unwrap();
        assert_eq!(config.upstream, "http://127.0.0.1:3000");
    }

    #[test]
    fn upstream_with_path_prefix_is_kept() {
        let config = ProxyConfig::builder()
            .upstream("https://artifacts.example.com/go/")
            .build()
            .unwrap();
        assert_eq!(config.upstream, "https://artifacts.example.com/go");
    }

    #[test]
    fn rejects_relative_upstream() {
        let err = ProxyConfig::builder()
            .upstream("proxy.golang.org")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUpstream { .. }), "{err}");
    }

    #[test]
    fn rejects_other_schemes() {
        let err = ProxyConfig::builder()
            .upstream("ftp://proxy.golang.org")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidUpstream {
                upstream: "ftp://proxy.golang.org".to_owned(),
                reason: "scheme must be http or https",
            }
        );
    }

    #[test]
    fn rejects_port_zero() {
        assert_eq!(
            ProxyConfig::builder().port(0).build(),
            Err(ConfigError::InvalidPort)
        );
    }
}
