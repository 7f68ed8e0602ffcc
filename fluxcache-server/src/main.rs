use std::process::ExitCode;

use clap::Parser;
use fluxcache_server::server::{build_service, serve, shutdown_signal};
use fluxcache_server::{CliArgs, StartupError, settings, telemetry};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report_startup_error(&error);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: CliArgs) -> Result<(), StartupError> {
    let config = settings::load(&cli)?;
    telemetry::init(&config)?;

    let service = build_service(&config)?;
    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    info!(
        %addr,
        upstream = %config.upstream,
        cache_dir = %config.cache_dir.display(),
        "fluxcache listening"
    );
    serve(listener, service, shutdown_signal()).await;
    Ok(())
}

fn report_startup_error(error: &StartupError) {
    if tracing::dispatcher::has_been_set() {
        tracing::error!(%error, "fluxcache failed to start");
    } else {
        eprintln!("fluxcache: {error}");
    }
}
