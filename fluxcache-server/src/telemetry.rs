//! tracing-subscriber setup.

use fluxcache::ProxyConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::error::StartupError;

const VERBOSE_DIRECTIVES: &str = "info,fluxcache=debug,fluxcache_core=debug,fluxcache_backend=debug,fluxcache_tower=debug,fluxcache_reqwest=debug,fluxcache_server=debug";

/// Picks the filter: `--verbose` wins over `RUST_LOG`, which wins over `info`.
pub fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_DIRECTIVES)
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy()
    }
}

/// Installs the global subscriber.
pub fn init(config: &ProxyConfig) -> Result<(), StartupError> {
    let fmt_layer = if config.log_json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().compact().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter(config.verbose))
        .with(fmt_layer)
        .try_init()
        .map_err(|err| StartupError::Telemetry(err.to_string()))
}
