//! Streamline - live HLS file server
//!
//! This library crate exposes the server for the binary and for integration
//! testing.

pub mod config;
pub mod server;
pub mod streaming;
