//! Configuration loading: TOML file discovery plus environment overrides.

pub use streamline_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variables consulted by [`apply_env_overrides`].
pub const ENV_BASE_DIR: &str = "STREAMLINE_BASE_DIR";
pub const ENV_ROUTE_PREFIX: &str = "STREAMLINE_ROUTE_PREFIX";
pub const ENV_MARKER_SUFFIX: &str = "STREAMLINE_MARKER_SUFFIX";
pub const ENV_POLL_INTERVAL_MS: &str = "STREAMLINE_POLL_INTERVAL_MS";
pub const ENV_MAX_IDLE_SECS: &str = "STREAMLINE_MAX_IDLE_SECS";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./streamline.toml",
        "~/.config/streamline/config.toml",
        "/etc/streamline/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::info!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Apply `STREAMLINE_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` as the variable source.
///
/// Empty values are ignored.
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(dir) = get(ENV_BASE_DIR) {
        config.stream.base_dir = shellexpand::tilde(&dir).into_owned().into();
    }
    if let Some(prefix) = get(ENV_ROUTE_PREFIX) {
        config.stream.route_prefix = prefix;
    }
    if let Some(suffix) = get(ENV_MARKER_SUFFIX) {
        config.stream.marker_suffix = suffix;
    }
    if let Some(ms) = get(ENV_POLL_INTERVAL_MS) {
        config.stream.poll_interval_ms = ms
            .trim()
            .parse()
            .with_context(|| format!("{ENV_POLL_INTERVAL_MS} is not a number: {ms:?}"))?;
    }
    if let Some(secs) = get(ENV_MAX_IDLE_SECS) {
        let secs: u64 = secs
            .trim()
            .parse()
            .with_context(|| format!("{ENV_MAX_IDLE_SECS} is not a number: {secs:?}"))?;
        // 0 switches the idle limit off.
        config.stream.max_idle_secs = (secs > 0).then_some(secs);
    }

    Ok(())
}
