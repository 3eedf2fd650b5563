//! Application configuration types.
//!
//! [`Config`] is deserialized from TOML. Every section defaults so an empty
//! file is valid; the defaults match the ingest pipeline's conventions
//! (`/lhls` routes, `.symlink` markers, 50 ms polling).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub stream: StreamConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Check the configuration.
    ///
    /// Hard problems are returned as [`Error::Config`]; soft ones come back
    /// as a list of warnings for the caller to log.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        let stream = &self.stream;
        if stream.buffer_size == 0 {
            return Err(Error::Config("stream.buffer_size must be greater than 0".into()));
        }
        if stream.poll_interval_ms == 0 {
            return Err(Error::Config(
                "stream.poll_interval_ms must be greater than 0".into(),
            ));
        }
        if stream.marker_suffix.is_empty() {
            return Err(Error::Config("stream.marker_suffix must not be empty".into()));
        }
        if !stream.route_prefix.starts_with('/') || stream.route_prefix.ends_with('/') {
            return Err(Error::Config(format!(
                "stream.route_prefix '{}' must start with '/' and must not end with '/'",
                stream.route_prefix
            )));
        }
        if !stream.base_dir.is_dir() {
            return Err(Error::Config(format!(
                "stream.base_dir {} is not a directory",
                stream.base_dir.display()
            )));
        }

        if stream.max_idle_secs.is_none() {
            warnings.push(
                "stream.max_idle_secs is unset; a stalled writer holds its responses open forever"
                    .into(),
            );
        }

        Ok(warnings)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Live file streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Directory every request path resolves under.
    pub base_dir: PathBuf,
    /// Route prefix stripped before resolving, e.g. `/lhls`.
    pub route_prefix: String,
    /// Appended to a media file's path to name its completion marker.
    pub marker_suffix: String,
    /// Pause between polls while the writer is still active.
    pub poll_interval_ms: u64,
    /// Maximum bytes read (and sent) per chunk.
    pub buffer_size: usize,
    /// Give up on a tail after this long without new bytes. Unset = never.
    pub max_idle_secs: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            route_prefix: "/lhls".into(),
            marker_suffix: ".symlink".into(),
            poll_interval_ms: 50,
            buffer_size: 20480,
            max_idle_secs: None,
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_idle(&self) -> Option<Duration> {
        self.max_idle_secs.map(Duration::from_secs)
    }
}
