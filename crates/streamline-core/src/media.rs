//! Media path resolution and content typing.

use std::path::{Component, Path, PathBuf};

use crate::error::Result;
use crate::Error;

pub const CONTENT_TYPE_PLAYLIST: &str = "application/x-mpegURL";
pub const CONTENT_TYPE_MP4: &str = "video/MP4";
pub const CONTENT_TYPE_TS: &str = "video/MP2T";

/// Content type for a live media file, chosen by extension.
///
/// Playlists and fragmented MP4 are recognised; everything else is served
/// as an MPEG transport stream segment.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "m3u8" => CONTENT_TYPE_PLAYLIST,
        "mp4" | "fmp4" => CONTENT_TYPE_MP4,
        _ => CONTENT_TYPE_TS,
    }
}

/// Join a client-supplied relative path onto `base`.
///
/// `.` components are dropped. Anything that could climb out of `base`
/// (`..`, a root, a drive prefix) is rejected rather than normalised away.
pub fn resolve_media_path(base: &Path, relative: &str) -> Result<PathBuf> {
    if relative.contains('\\') || relative.contains('\0') {
        return Err(Error::Validation(format!(
            "invalid character in media path: {relative:?}"
        )));
    }

    let mut resolved = base.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Validation(format!(
                    "media path escapes base directory: {relative:?}"
                )));
            }
        }
    }

    if depth == 0 {
        return Err(Error::Validation("empty media path".into()));
    }

    Ok(resolved)
}
