//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temporary media directory and a
//! full [`AppContext`] pointed at it. [`TestHarness::with_server`] starts
//! Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use streamline::config::Config;
use streamline::server::{create_router, AppContext};
use tempfile::TempDir;

/// Test harness wrapping an [`AppContext`] that serves a temp directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub media_dir: TempDir,
}

impl TestHarness {
    /// Create a harness with a fast poll interval and no idle limit.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness, letting the caller adjust the config first.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let media_dir = tempfile::tempdir().expect("failed to create media dir");
        let mut config = Config::default();
        config.stream.base_dir = media_dir.path().to_path_buf();
        config.stream.poll_interval_ms = 10;
        adjust(&mut config);

        Self {
            ctx: AppContext::new(config),
            media_dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start serving this harness on a random port.
    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Absolute path of a file inside the media directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.media_dir.path().join(name)
    }

    /// Write a finished media file.
    pub fn write_file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Write a file that the "ingest" is still producing (marker present).
    pub fn write_growing_file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.write_file(name, data);
        std::fs::write(marker_for(&path), b"").unwrap();
        path
    }
}

/// Marker path for a media file under the default suffix.
pub fn marker_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".symlink");
    PathBuf::from(name)
}

/// Append bytes to a file the way the ingest process would.
pub fn append(path: &Path, data: &[u8]) {
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(data).unwrap();
    f.flush().unwrap();
}

/// Finish a growing file: remove its marker.
pub fn finish(path: &Path) {
    std::fs::remove_file(marker_for(path)).unwrap();
}

/// Deterministic test payload.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
