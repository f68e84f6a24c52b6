use crate::error::{StructuredError, TrackerError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A [`TrackerError`] on its way out of an HTTP handler.
///
/// The body is the same structured JSON the CLI prints with `--json`.
#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        Self(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self(TrackerError::Other(anyhow::anyhow!(
            "storage task failed: {err}"
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let structured = StructuredError::from_error(&self.0);
        let status = StatusCode::from_u16(structured.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, code = structured.code.as_str(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        (status, Json(structured.to_json())).into_response()
    }
}
