//! Completion markers.
//!
//! The ingest process creates `<file><suffix>` before it starts writing a
//! segment or playlist and removes it once the file is final. Streamline
//! only ever looks at the marker.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Marker associated 1:1 with a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMarker {
    path: PathBuf,
}

impl CompletionMarker {
    /// Marker for `file`, named by appending `suffix` to the full file name.
    pub fn for_file(file: &Path, suffix: &str) -> Self {
        let mut name: OsString = file.as_os_str().to_owned();
        name.push(suffix);
        Self {
            path: PathBuf::from(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the writer still holds the file open for writing.
    ///
    /// Follows symlinks. Any stat failure counts as "absent".
    pub async fn is_present(&self) -> bool {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::debug!(
                    marker = %self.path.display(),
                    "Marker stat failed, treating as absent: {e}"
                );
                false
            }
        }
    }
}
