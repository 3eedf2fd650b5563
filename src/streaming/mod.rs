//! Live media streaming.
//!
//! Serves files from the configured base directory while the ingest process
//! may still be writing them. A file whose completion marker exists is
//! tailed: the response stays open and new bytes are forwarded as they land,
//! until the marker is removed and the file is read to its end.
//!
//! # Routes
//!
//! - `GET {route_prefix}/{*path}` - stream `base_dir/path` (default prefix `/lhls`)

mod live;

pub use live::{serve_live_file, ActiveStreams, StreamGuard};
