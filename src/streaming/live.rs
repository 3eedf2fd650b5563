//! Tailing file handler.
//!
//! Status and headers are committed as soon as the file opens. The body is
//! driven by a [`Tailer`]; a fault after that point surfaces as a body error,
//! which makes hyper abort just this connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Extension,
};
use futures_core::Stream;
use streamline_core::media::{content_type_for, resolve_media_path};
use streamline_core::{Error, TailEvent, TailOptions, Tailer};

use crate::server::request_id::RequestId;
use crate::server::{AppContext, AppError};

/// Count of response bodies currently streaming.
#[derive(Debug, Clone, Default)]
pub struct ActiveStreams(Arc<AtomicUsize>);

impl ActiveStreams {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Register a stream; it is deregistered when the guard drops.
    pub fn track(&self) -> StreamGuard {
        self.0.fetch_add(1, Ordering::Relaxed);
        StreamGuard(self.clone())
    }
}

/// Keeps a stream counted in [`ActiveStreams`] while alive.
#[derive(Debug)]
pub struct StreamGuard(ActiveStreams);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        (self.0).0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// GET {route_prefix}/{*path}
pub async fn serve_live_file(
    State(ctx): State<AppContext>,
    Path(relative): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Result<Response, AppError> {
    tracing::info!("Received download request for {relative}");

    let stream_config = &ctx.config.stream;
    let file_path = resolve_media_path(&stream_config.base_dir, &relative)?;

    let tailer = Tailer::open(
        &file_path,
        &stream_config.marker_suffix,
        TailOptions::from(stream_config),
        ctx.shutdown.child_token(),
    )
    .await?;

    tracing::debug!("file {relative} was requested");

    let guard = ctx.active_streams.track();
    let body = Body::from_stream(tail_body(tailer, guard, request_id));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::TRANSFER_ENCODING, "chunked")
        .header(header::CONNECTION, "Keep-Alive")
        .header(header::CONTENT_TYPE, content_type_for(&file_path))
        .body(body)
        .map_err(|e| Error::Internal(format!("failed to build response: {e}")))?;

    Ok(response)
}

/// Body stream for one tail. Ends after `Complete` or the first error.
fn tail_body(
    mut tailer: Tailer,
    guard: StreamGuard,
    request_id: String,
) -> impl Stream<Item = Result<Bytes, Error>> + Send + 'static {
    async_stream::stream! {
        let _guard = guard;

        loop {
            match tailer.next_event().await {
                Ok(TailEvent::Data(chunk)) => yield Ok(chunk),
                Ok(TailEvent::Complete) => {
                    tracing::debug!(
                        request_id = %request_id,
                        "file {} was downloaded ({} bytes)",
                        tailer.path().display(),
                        tailer.bytes_read()
                    );
                    break;
                }
                Err(e) => {
                    if matches!(e, Error::Cancelled) {
                        tracing::debug!(
                            request_id = %request_id,
                            "Stream of {} cancelled by shutdown",
                            tailer.path().display()
                        );
                    } else if matches!(e, Error::IdleTimeout { .. }) {
                        tracing::warn!(request_id = %request_id, "Giving up on writer: {e}");
                    } else {
                        tracing::error!(
                            request_id = %request_id,
                            "Aborting stream of {}: {e}",
                            tailer.path().display()
                        );
                    }
                    yield Err(e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_router;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::io::Write;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_context(dir: &std::path::Path) -> AppContext {
        let mut config = Config::default();
        config.stream.base_dir = dir.to_path_buf();
        config.stream.poll_interval_ms = 10;
        AppContext::new(config)
    }

    async fn get(ctx: &AppContext, uri: &str) -> Response {
        create_router(ctx.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_finished_segment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seg1.ts"), vec![7u8; 1000]).unwrap();
        let ctx = test_context(dir.path());

        let response = get(&ctx, "/lhls/seg1.ts").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "video/MP2T");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::TRANSFER_ENCODING], "chunked");
        assert_eq!(headers[header::CONNECTION], "Keep-Alive");
        assert!(headers.get(header::CONTENT_LENGTH).is_none());

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), 1000);
        assert_eq!(ctx.active_streams.count(), 0);
    }

    #[tokio::test]
    async fn content_type_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            ("live.m3u8", "application/x-mpegURL"),
            ("init.mp4", "video/MP4"),
            ("part0.fmp4", "video/MP4"),
            ("seg9.ts", "video/MP2T"),
            ("audio.aac", "video/MP2T"),
        ];
        for (name, _) in &cases {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let ctx = test_context(dir.path());

        for (name, expected) in cases {
            let response = get(&ctx, &format!("/lhls/{name}")).await;
            assert_eq!(response.status(), StatusCode::OK, "{name}");
            assert_eq!(response.headers()[header::CONTENT_TYPE], expected, "{name}");
        }
    }

    #[tokio::test]
    async fn nested_paths_resolve_under_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cam1/720p")).unwrap();
        std::fs::write(dir.path().join("cam1/720p/seg3.ts"), b"nested").unwrap();
        let ctx = test_context(dir.path());

        let response = get(&ctx, "/lhls/cam1/720p/seg3.ts").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"nested");
    }

    #[tokio::test]
    async fn missing_file_is_404_without_body() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());

        let response = get(&ctx, "/lhls/nope.ts").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
        assert_eq!(ctx.active_streams.count(), 0);
    }

    #[tokio::test]
    async fn missing_file_with_marker_is_still_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("next.ts.symlink"), b"").unwrap();
        let ctx = test_context(dir.path());

        let response = get(&ctx, "/lhls/next.ts").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_is_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cam1")).unwrap();
        let ctx = test_context(dir.path());

        let response = get(&ctx, "/lhls/cam1").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let outer = tempfile::tempdir().unwrap();
        let base = outer.path().join("hls");
        std::fs::create_dir(&base).unwrap();
        std::fs::write(outer.path().join("secret.ts"), b"secret").unwrap();
        let ctx = test_context(&base);

        for uri in ["/lhls/../secret.ts", "/lhls/%2E%2E/secret.ts", "/lhls/a/%2e%2e/%2e%2e/secret.ts"] {
            let response = get(&ctx, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert!(body.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn custom_prefix_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seg1.ts"), b"abc").unwrap();
        let mut config = Config::default();
        config.stream.base_dir = dir.path().to_path_buf();
        config.stream.route_prefix = "/live/hls".into();
        let ctx = AppContext::new(config);

        assert_eq!(get(&ctx, "/live/hls/seg1.ts").await.status(), StatusCode::OK);
        assert_eq!(get(&ctx, "/lhls/seg1.ts").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn growing_playlist_is_held_open_until_marker_removed() {
        let dir = tempfile::tempdir().unwrap();
        let playlist = dir.path().join("live.m3u8");
        let marker = dir.path().join("live.m3u8.symlink");
        let initial = b"#EXTM3U\n#EXT-X-VERSION:3\n".to_vec();
        std::fs::write(&playlist, &initial).unwrap();
        std::fs::write(&marker, b"").unwrap();
        let ctx = test_context(dir.path());

        let response = get(&ctx, "/lhls/live.m3u8").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-mpegURL"
        );
        assert_eq!(ctx.active_streams.count(), 1);

        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let mut f = std::fs::OpenOptions::new()
                .append(true)
                .open(&playlist)
                .unwrap();
            f.write_all(&[b'#'; 200]).unwrap();
            drop(f);
            std::fs::remove_file(&marker).unwrap();
        });

        let body = tokio::time::timeout(
            Duration::from_secs(5),
            response.into_body().collect(),
        )
        .await
        .expect("stream should finish once the marker is gone")
        .unwrap()
        .to_bytes();
        writer.await.unwrap();

        assert_eq!(body.len(), initial.len() + 200);
        assert_eq!(&body[..initial.len()], &initial[..]);
        assert_eq!(ctx.active_streams.count(), 0);
    }

    #[tokio::test]
    async fn shutdown_aborts_open_tails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seg7.ts"), b"partial").unwrap();
        std::fs::write(dir.path().join("seg7.ts.symlink"), b"").unwrap();
        let ctx = test_context(dir.path());

        let response = get(&ctx, "/lhls/seg7.ts").await;
        assert_eq!(response.status(), StatusCode::OK);

        let trigger = ctx.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            response.into_body().collect(),
        )
        .await
        .expect("shutdown should end the stream");
        assert!(result.is_err());
        assert_eq!(ctx.active_streams.count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn read_fault_aborts_body_and_releases_stream() {
        let active = ActiveStreams::default();
        let tailer = Tailer::open(
            std::path::Path::new("/proc/self/mem"),
            ".symlink",
            TailOptions::default(),
            tokio_util::sync::CancellationToken::new(),
        )
        .await
        .unwrap();

        let body = Body::from_stream(tail_body(tailer, active.track(), "req-1".into()));
        assert_eq!(active.count(), 1);

        let result = tokio::time::timeout(Duration::from_secs(5), body.collect())
            .await
            .expect("read fault should end the body");
        assert!(result.is_err());
        assert_eq!(active.count(), 0);
    }

    #[test]
    fn guards_track_active_streams() {
        let active = ActiveStreams::default();
        let a = active.track();
        let b = active.track();
        assert_eq!(active.count(), 2);
        drop(a);
        assert_eq!(active.count(), 1);
        drop(b);
        assert_eq!(active.count(), 0);
    }
}
