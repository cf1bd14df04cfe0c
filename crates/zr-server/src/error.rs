//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; every [`zr_core::Error`]
//! becomes a `{"message", "code"}` JSON body with the status from
//! [`zr_core::Error::http_status`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: zr_core::Error,
}

impl AppError {
    pub fn new(inner: zr_core::Error) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &zr_core::Error {
        &self.inner
    }
}

impl From<zr_core::Error> for AppError {
    fn from(e: zr_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Request rejected");
        }

        let body = json!({
            "message": self.inner.public_message(),
            "code": self.inner.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
