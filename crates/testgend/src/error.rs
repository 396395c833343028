//! Error types for testgend.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    /// The caller must correct the request (missing code, unknown provider,
    /// missing API key for a hosted provider).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network-level failure reaching a provider. Surfaced verbatim, never
    /// retried here.
    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// The provider answered with a non-success status. The body is carried
    /// for diagnostics.
    #[error("Provider error {status}: {body}")]
    ProviderError { status: u16, body: String },

    /// Requested model is not loaded on the local runner. Distinct from a
    /// generic error so the caller can offer to pull it.
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// History store failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl GenError {
    fn status_code(&self) -> StatusCode {
        match self {
            GenError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GenError::ModelNotAvailable(_) => StatusCode::NOT_FOUND,
            GenError::ProviderUnreachable(_) => StatusCode::BAD_GATEWAY,
            GenError::ProviderError { .. } => StatusCode::BAD_GATEWAY,
            GenError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for GenError {
    fn from(e: rusqlite::Error) -> Self {
        GenError::Storage(e.to_string())
    }
}

/// Synchronous-mode failures become a JSON error payload with a non-success
/// status. Streaming-mode failures are delivered in-stream instead (see
/// the generation module) and never go through this path.
impl IntoResponse for GenError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            GenError::InvalidRequest("no code".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GenError::ModelNotAvailable("mistral".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GenError::ProviderUnreachable("connect refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn provider_error_carries_body() {
        let e = GenError::ProviderError {
            status: 429,
            body: "rate limited".into(),
        };
        assert!(e.to_string().contains("429"));
        assert!(e.to_string().contains("rate limited"));
    }
}
