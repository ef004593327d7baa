//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use thing_runtime::ThingError;

/// Error returned by HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Thing(#[from] ThingError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Thing(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `"400 Bad Request"` style status line used in WebSocket error messages
pub fn status_line(code: u16) -> String {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ThingError::not_found("thing", "x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ThingError::ReadOnly("level".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::BadRequest("nope".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(400), "400 Bad Request");
        assert_eq!(status_line(404), "404 Not Found");
    }
}
