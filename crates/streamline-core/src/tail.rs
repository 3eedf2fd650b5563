//! Follow a file that an external writer may still be appending to.
//!
//! A [`Tailer`] reads the file in `buffer_size` chunks. Full chunks are
//! handed out back to back. After a short read it consults the file's
//! [`CompletionMarker`]: while the marker exists the tail pauses for
//! `poll_interval` and tries again; once the marker is gone the remaining
//! bytes are drained and the next end-of-file completes the stream.
//!
//! Marker absence is latched *before* an end-of-file is accepted as final,
//! so bytes appended just before the writer removed its marker are never
//! dropped.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::Result;
use crate::marker::CompletionMarker;
use crate::Error;

/// Tuning for a single tail.
#[derive(Debug, Clone)]
pub struct TailOptions {
    pub buffer_size: usize,
    pub poll_interval: Duration,
    pub max_idle: Option<Duration>,
}

impl Default for TailOptions {
    fn default() -> Self {
        TailOptions::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for TailOptions {
    fn from(config: &StreamConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
            poll_interval: config.poll_interval(),
            max_idle: config.max_idle(),
        }
    }
}

/// What the tail produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// Bytes read from the current offset, in file order.
    Data(Bytes),
    /// Writer finished and every byte has been handed out.
    Complete,
}

/// Tail state for one open file.
#[derive(Debug)]
pub struct Tailer {
    file: File,
    path: PathBuf,
    marker: CompletionMarker,
    buf: Vec<u8>,
    options: TailOptions,
    cancel: CancellationToken,
    /// The last read came back short; check the writer before reading again.
    drained: bool,
    writer_finished: bool,
    last_progress: Instant,
    polls: u64,
    bytes_read: u64,
}

impl Tailer {
    /// Open `path` for tailing.
    ///
    /// Fails with [`Error::NotFound`] if the file cannot be opened or is not
    /// a regular file. There is no waiting for a file to appear.
    pub async fn open(
        path: &Path,
        marker_suffix: &str,
        options: TailOptions,
        cancel: CancellationToken,
    ) -> Result<Self> {
        // Stat before opening: opening a FIFO would block until a writer shows up.
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                tracing::warn!("Not a regular file: {}", path.display());
                return Err(Error::not_found("media file", path.display()));
            }
            Err(e) => {
                tracing::warn!("Failed to stat file {}: {e}", path.display());
                return Err(Error::not_found("media file", path.display()));
            }
        }

        let file = match File::open(path).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Failed to open file {}: {e}", path.display());
                return Err(Error::not_found("media file", path.display()));
            }
        };

        Ok(Self {
            file,
            path: path.to_path_buf(),
            marker: CompletionMarker::for_file(path, marker_suffix),
            buf: vec![0u8; options.buffer_size.max(1)],
            options,
            cancel,
            drained: false,
            writer_finished: false,
            last_progress: Instant::now(),
            polls: 0,
            bytes_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the tail paused waiting for the writer.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Total bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Produce the next chunk, or [`TailEvent::Complete`].
    ///
    /// Waits internally while the writer is active. Errors are final: a read
    /// fault, the idle limit, or cancellation.
    pub async fn next_event(&mut self) -> Result<TailEvent> {
        loop {
            if self.drained {
                self.drained = false;
                if !self.writer_finished {
                    if self.marker.is_present().await {
                        self.wait_for_writer().await?;
                    } else {
                        tracing::debug!(
                            "{} upload finished, draining remaining bytes",
                            self.path.display()
                        );
                        self.writer_finished = true;
                    }
                }
            }

            let n = self.file.read(&mut self.buf).await?;

            if n == 0 {
                if self.writer_finished {
                    tracing::debug!(
                        "{} fully streamed ({} bytes)",
                        self.path.display(),
                        self.bytes_read
                    );
                    return Ok(TailEvent::Complete);
                }
                self.drained = true;
                continue;
            }

            tracing::trace!("{} read {n} bytes", self.path.display());
            self.bytes_read += n as u64;
            self.last_progress = Instant::now();
            if n < self.buf.len() {
                self.drained = true;
            }
            return Ok(TailEvent::Data(Bytes::copy_from_slice(&self.buf[..n])));
        }
    }

    async fn wait_for_writer(&mut self) -> Result<()> {
        if let Some(max_idle) = self.options.max_idle {
            let idle = self.last_progress.elapsed();
            if idle >= max_idle {
                return Err(Error::IdleTimeout {
                    path: self.path.clone(),
                    idle,
                });
            }
        }

        self.polls += 1;
        tracing::debug!(
            "Read to end of {}, but uploading is not finished yet",
            self.path.display()
        );

        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(self.options.poll_interval) => Ok(()),
        }
    }
}
