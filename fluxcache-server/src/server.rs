//! Service assembly and the HTTP/1 accept loop.

use std::convert::Infallible;
use std::future::Future;

use bytes::Bytes;
use fluxcache::{BroadcastConcurrencyManager, FetchCoordinator, FetchOutcome, ProxyConfig};
use fluxcache_backend::DiskBackend;
use fluxcache_reqwest::ReqwestUpstream;
use fluxcache_tower::ProxyService;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::Service;
use tracing::{debug, error, info};

use crate::error::StartupError;

/// The service the binary runs: disk cache, reqwest upstream and in-process
/// single-flight.
pub type AppService =
    ProxyService<DiskBackend, ReqwestUpstream, BroadcastConcurrencyManager<FetchOutcome>>;

/// Creates the cache root and wires the proxy service for `config`.
pub fn build_service(config: &ProxyConfig) -> Result<AppService, StartupError> {
    let backend = DiskBackend::builder().root(&config.cache_dir).build()?;
    let coordinator = FetchCoordinator::builder()
        .backend(backend)
        .upstream(ReqwestUpstream::default())
        .upstream_base(config.upstream.clone())
        .concurrency_manager(BroadcastConcurrencyManager::new())
        .build();
    Ok(ProxyService::new(coordinator))
}

/// Accepts connections until `shutdown` resolves.
///
/// Each connection runs on its own task. Connections already accepted are
/// left to finish on their own.
pub async fn serve<S, F>(listener: TcpListener, service: S, shutdown: F)
where
    S: Service<Request<Incoming>, Response = Response<Full<Bytes>>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        error!(%error, "failed to accept connection");
                        continue;
                    }
                };
                debug!(%peer, "accepted connection");
                let io = TokioIo::new(stream);
                let service = TowerToHyperService::new(service.clone());
                tokio::spawn(async move {
                    if let Err(error) = http1::Builder::new().serve_connection(io, service).await {
                        error!(%peer, %error, "connection error");
                    }
                });
            }
            () = &mut shutdown => {
                info!("shutdown signal received, no longer accepting connections");
                return;
            }
        }
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
