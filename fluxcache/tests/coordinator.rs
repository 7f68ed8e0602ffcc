mod common;

use bytes::Bytes;
use common::{
    BrokenBodyUpstream, CountingUpstream, UPSTREAM_BASE, UnreachableUpstream, count_files,
};
use fluxcache::backend::{Backend, DiskBackend};
use fluxcache::{
    CacheKey, CacheStatus, FetchCoordinator, ModulePath, ModulePathError, ProxyError,
    ProxyRequest, ResponseSource, UpstreamFailure,
};
use http::StatusCode;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn disk(dir: &TempDir) -> DiskBackend {
    DiskBackend::builder().root(dir.path()).build().unwrap()
}

fn coordinator<U>(dir: &TempDir, upstream: U) -> FetchCoordinator<DiskBackend, U> {
    FetchCoordinator::builder()
        .backend(disk(dir))
        .upstream(upstream)
        .upstream_base(UPSTREAM_BASE)
        .build()
}

#[tokio::test]
async fn miss_then_hit() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(br#"{"Version":"v1.0.0"}"#);
    let coordinator = coordinator(&dir, upstream.clone());

    let (outcome, ctx) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar@v1.0.0.info"))
        .await;
    let response = outcome.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), &Bytes::from_static(br#"{"Version":"v1.0.0"}"#));
    assert_eq!(ctx.status, CacheStatus::Miss);
    assert_eq!(ctx.source, ResponseSource::Upstream);
    assert_eq!(
        upstream.targets(),
        vec![format!("{UPSTREAM_BASE}/github.com/foo/bar@v1.0.0.info")]
    );

    // The artifact is on disk with the exact upstream bytes.
    let location = coordinator
        .backend()
        .locate(&ModulePath::new("github.com/foo/bar@v1.0.0.info"));
    assert_eq!(
        std::fs::read(location.path()).unwrap(),
        br#"{"Version":"v1.0.0"}"#
    );

    let (outcome, ctx) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar@v1.0.0.info"))
        .await;
    let response = outcome.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), &Bytes::from_static(br#"{"Version":"v1.0.0"}"#));
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["content-length"], "20");
    assert_eq!(ctx.status, CacheStatus::Hit);
    assert_eq!(ctx.source, ResponseSource::Backend("disk".into()));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn upstream_headers_are_copied_on_miss_only() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(b"module github.com/foo/bar\n")
        .header("content-type", "text/plain; charset=utf-8")
        .header("cache-control", "public, max-age=10800");
    let coordinator = coordinator(&dir, upstream);
    let request = ProxyRequest::get("/github.com/foo/bar/@v/v1.0.0.mod");

    let (outcome, _) = coordinator.handle(request.clone()).await;
    let miss = outcome.unwrap();
    assert_eq!(miss.headers()["cache-control"], "public, max-age=10800");
    assert_eq!(miss.headers()["content-type"], "text/plain; charset=utf-8");

    let (outcome, _) = coordinator.handle(request).await;
    let hit = outcome.unwrap();
    assert!(hit.headers().get("cache-control").is_none());
    assert_eq!(hit.headers()["content-type"], "text/plain; charset=utf-8");
}

#[tokio::test]
async fn query_is_forwarded_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(b"v1.0.0\n");
    let coordinator = coordinator(&dir, upstream.clone());

    coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/list").with_query("go-get=1&x=%20"))
        .await
        .0
        .unwrap();
    coordinator
        .handle(ProxyRequest::get("/github.com/foo/baz/@v/list").with_query(""))
        .await
        .0
        .unwrap();

    assert_eq!(
        upstream.targets(),
        vec![
            format!("{UPSTREAM_BASE}/github.com/foo/bar/@v/list?go-get=1&x=%20"),
            format!("{UPSTREAM_BASE}/github.com/foo/baz/@v/list"),
        ]
    );
}

#[tokio::test]
async fn encoded_path_is_forwarded_raw_and_cached_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(b"v0.1.0\n");
    let coordinator = coordinator(&dir, upstream.clone());

    coordinator
        .handle(ProxyRequest::get("/github.com/%21azure/sdk/@v/list"))
        .await
        .0
        .unwrap();

    assert_eq!(
        upstream.targets(),
        vec![format!("{UPSTREAM_BASE}/github.com/%21azure/sdk/@v/list")]
    );
    let key = CacheKey::from_module_path(&ModulePath::new("github.com/!azure/sdk/@v/list"));
    assert_eq!(
        coordinator.backend().read(&key).await.unwrap(),
        Some(Bytes::from_static(b"v0.1.0\n"))
    );
}

#[tokio::test]
async fn upstream_error_status_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::with_status(StatusCode::INTERNAL_SERVER_ERROR, b"boom");
    let coordinator = coordinator(&dir, upstream.clone());

    let (outcome, _) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/list"))
        .await;
    let err = outcome.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(err.public_message(), "upstream error");
    assert!(matches!(
        err,
        ProxyError::UpstreamUnavailable(UpstreamFailure::Status(StatusCode::INTERNAL_SERVER_ERROR))
    ));
    assert_eq!(count_files(dir.path()), 0);

    // Nothing negative is remembered: the next request asks again.
    let _ = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/list"))
        .await;
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn not_found_is_a_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::with_status(StatusCode::NOT_FOUND, b"not found");
    let coordinator = coordinator(&dir, upstream);

    let (outcome, _) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/missing/@v/list"))
        .await;
    assert_eq!(outcome.unwrap_err().status_code(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn unreachable_upstream_is_a_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = UnreachableUpstream::default();
    let coordinator = coordinator(&dir, upstream.clone());

    let (outcome, _) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/list"))
        .await;
    let err = outcome.unwrap_err();
    assert!(matches!(
        err,
        ProxyError::UpstreamUnavailable(UpstreamFailure::Transport(_))
    ));
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(upstream.calls(), 1);
    assert_eq!(count_files(dir.path()), 0);
}

#[tokio::test]
async fn broken_body_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let coordinator = coordinator(&dir, BrokenBodyUpstream);

    let (outcome, _) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/v1.0.0.zip"))
        .await;
    let err = outcome.unwrap_err();
    assert!(matches!(err, ProxyError::UpstreamBody(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.public_message(), "read error");
    assert_eq!(count_files(dir.path()), 0);
}

#[tokio::test]
async fn bad_escape_is_rejected_before_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(b"unused");
    let coordinator = coordinator(&dir, upstream.clone());

    let (outcome, _) = coordinator.handle(ProxyRequest::get("/foo%zz")).await;
    let err = outcome.unwrap_err();
    assert!(matches!(
        err,
        ProxyError::BadPath(ModulePathError::InvalidEscape { offset: 3, .. })
    ));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.public_message(), "bad path");
    assert_eq!(upstream.calls(), 0);
    assert_eq!(count_files(dir.path()), 0);
}

#[tokio::test]
async fn write_failure_still_serves_body() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(b"v1.0.0\n");
    let coordinator = coordinator(&dir, upstream.clone());
    let key = CacheKey::from_module_path(&ModulePath::new("github.com/foo/bar/@v/list"));
    let hex = key.to_hex();

    // A regular file where the first shard directory should go.
    std::fs::write(dir.path().join(&hex[0..2]), b"in the way").unwrap();

    let (outcome, ctx) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/list"))
        .await;
    assert_eq!(outcome.unwrap().body(), &Bytes::from_static(b"v1.0.0\n"));
    assert!(ctx.write_error);
    assert_eq!(ctx.status, CacheStatus::Miss);

    // Nothing was cached, so the next request fetches again.
    let (outcome, _) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/list"))
        .await;
    assert!(outcome.is_ok());
    assert_eq!(upstream.calls(), 2);
}

#[tokio::test]
async fn read_error_is_flagged_and_treated_as_miss() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(b"v1.0.0\n");
    let coordinator = coordinator(&dir, upstream.clone());
    let location = coordinator
        .backend()
        .locate(&ModulePath::new("github.com/foo/bar/@v/list"));

    // A directory where the artifact file should be.
    std::fs::create_dir_all(location.path()).unwrap();

    let (outcome, ctx) = coordinator
        .handle(ProxyRequest::get("/github.com/foo/bar/@v/list"))
        .await;
    assert_eq!(outcome.unwrap().body(), &Bytes::from_static(b"v1.0.0\n"));
    assert!(ctx.read_error);
    assert_eq!(ctx.status, CacheStatus::Miss);
    assert!(ctx.storage_degraded());
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn trailing_slash_in_base_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = CountingUpstream::ok(b"v1.0.0\n");
    let coordinator = FetchCoordinator::builder()
        .backend(disk(&dir))
        .upstream(upstream.clone())
        .upstream_base("http://127.0.0.1:3000/")
        .build();

    coordinator
        .handle(ProxyRequest::get("/golang.org/x/text/@v/list"))
        .await
        .0
        .unwrap();
    assert_eq!(coordinator.upstream_base(), "http://127.0.0.1:3000");
    assert_eq!(
        upstream.targets(),
        vec!["http://127.0.0.1:3000/golang.org/x/text/@v/list".to_owned()]
    );
}

#[tokio::test]
async fn type_erased_backend() {
    use std::sync::Arc;

    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn Backend> = Arc::new(
        DiskBackend::builder()
            .root(dir.path())
            .label("erased")
            .build()
            .unwrap(),
    );
    let upstream = CountingUpstream::ok(b"v1.0.0\n");
    let coordinator = FetchCoordinator::builder()
        .backend(backend)
        .upstream(upstream.clone())
        .upstream_base(UPSTREAM_BASE)
        .build();

    let (outcome, ctx) = coordinator.handle(ProxyRequest::get("/erased/@v/list")).await;
    assert_eq!(outcome.unwrap().body(), &Bytes::from_static(b"v1.0.0\n"));
    assert_eq!(ctx.status, CacheStatus::Miss);

    let (outcome, ctx) = coordinator.handle(ProxyRequest::get("/erased/@v/list")).await;
    assert_eq!(outcome.unwrap().body(), &Bytes::from_static(b"v1.0.0\n"));
    assert_eq!(ctx.status, CacheStatus::Hit);
    assert_eq!(ctx.source, ResponseSource::Backend("erased".into()));
    assert_eq!(upstream.calls(), 1);
}
