#![allow(dead_code)]

use std::convert::Infallible;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use fluxcache::{Upstream, UpstreamRequest};
use futures::future::BoxFuture;
use http::{Response, StatusCode};
use http_body::{Body, Frame};
use http_body_util::Full;

pub const UPSTREAM_BASE: &str = "https://proxy.example.test";

/// Upstream stand-in that answers every request with the same response and
/// remembers what it was asked for.
#[derive(Clone)]
pub struct CountingUpstream {
    calls: Arc<AtomicUsize>,
    targets: Arc<Mutex<Vec<String>>>,
    status: StatusCode,
    body: Bytes,
    headers: Vec<(&'static str, &'static str)>,
    first_call_delay: Option<Duration>,
    delay: Option<Duration>,
}

impl CountingUpstream {
    pub fn ok(body: &'static [u8]) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn with_status(status: StatusCode, body: &'static [u8]) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            targets: Arc::new(Mutex::new(Vec::new())),
            status,
            body: Bytes::from_static(body),
            headers: Vec::new(),
            first_call_delay: None,
            delay: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Delays every response.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delays only the response to the first call.
    pub fn delay_first_call(mut self, delay: Duration) -> Self {
        self.first_call_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

impl Upstream<UpstreamRequest> for CountingUpstream {
    type Response = Result<Response<Full<Bytes>>, Infallible>;
    type Future = BoxFuture<'static, Self::Response>;

    fn call(&mut self, req: UpstreamRequest) -> Self::Future {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(req.uri().to_string());

        let delay = match (index, self.first_call_delay) {
            (0, Some(delay)) => Some(delay),
            _ => self.delay,
        };
        let mut builder = Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(*name, *value);
        }
        let response = builder.body(Full::new(self.body.clone())).unwrap();

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(response)
        })
    }
}

/// Upstream whose requests never reach a server.
#[derive(Clone, Default)]
pub struct UnreachableUpstream {
    calls: Arc<AtomicUsize>,
}

impl UnreachableUpstream {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Upstream<UpstreamRequest> for UnreachableUpstream {
    type Response = Result<Response<Full<Bytes>>, io::Error>;
    type Future = std::future::Ready<Self::Response>;

    fn call(&mut self, _req: UpstreamRequest) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Err(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

/// Body that fails on the first frame.
pub struct BrokenBody;

impl Body for BrokenBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(Some(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))))
    }
}

/// Upstream that answers `200 OK` but drops the connection mid-body.
#[derive(Clone, Default)]
pub struct BrokenBodyUpstream;

impl Upstream<UpstreamRequest> for BrokenBodyUpstream {
    type Response = Result<Response<BrokenBody>, Infallible>;
    type Future = std::future::Ready<Self::Response>;

    fn call(&mut self, _req: UpstreamRequest) -> Self::Future {
        std::future::ready(Ok(Response::new(BrokenBody)))
    }
}

/// Number of regular files below `root`, recursively.
pub fn count_files(root: &std::path::Path) -> usize {
    std::fs::read_dir(root)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() {
                        count_files(&path)
                    } else {
                        1
                    }
                })
                .sum()
        })
        .unwrap_or(0)
}
