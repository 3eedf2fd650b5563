//! streamline-core: live file tailing, completion markers, media path
//! handling, configuration and the shared error type.
//!
//! Nothing in this crate knows about HTTP. The server crate wires a
//! [`tail::Tailer`] into a response body and maps [`Error`] onto status
//! codes via [`Error::http_status`].

pub mod config;
pub mod error;
pub mod marker;
pub mod media;
pub mod tail;

pub use error::{Error, Result};
pub use marker::CompletionMarker;
pub use tail::{TailEvent, TailOptions, Tailer};
