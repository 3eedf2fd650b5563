//! Error-to-HTTP response conversion.
//!
//! Lets handlers return `Result<T, AppError>` and bubble up
//! [`streamline_core::Error`] with `?`. Responses carry the status only;
//! media clients never get an error document in place of a segment.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use streamline_core::Error;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(Error);

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self(inner)
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in handler");
        } else {
            tracing::debug!(status = %status, error = %self.0, "Request rejected");
        }

        status.into_response()
    }
}
