use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, builder::BoolishValueParser};
use fluxcache::ProxyConfig;

/// Command-line arguments for the fluxcache binary.
///
/// Every setting is optional here: unset values fall back to the config
/// file, then to the built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(name = "fluxcache", version, about = "Caching proxy for Go module downloads")]
pub struct CliArgs {
    /// Optional path to a YAML configuration file.
    #[arg(long = "config-file", env = "FLUXCACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Cache root directory.
    #[arg(long = "cache", env = "FLUXCACHE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, env = "FLUXCACHE_HOST", value_name = "ADDR")]
    pub host: Option<IpAddr>,

    /// Port to listen on.
    #[arg(long, env = "FLUXCACHE_PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Upstream module proxy.
    #[arg(long, env = "FLUXCACHE_UPSTREAM", value_name = "URL")]
    pub upstream: Option<String>,

    /// Enable debug logging.
    #[arg(
        short = 'v',
        long,
        env = "FLUXCACHE_VERBOSE",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub verbose: Option<bool>,

    /// Emit logs as JSON lines.
    #[arg(
        long = "log-json",
        env = "FLUXCACHE_LOG_JSON",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

impl CliArgs {
    /// Applies the values given on the command line or in the environment.
    pub fn apply_overrides(&self, config: &mut ProxyConfig) {
        if let Some(cache_dir) = self.cache_dir.as_ref() {
            config.cache_dir = cache_dir.clone();
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(upstream) = self.upstream.as_ref() {
            config.upstream = upstream.clone();
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(log_json) = self.log_json {
            config.log_json = log_json;
        }
    }
}
