use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no query supplied in request body or 'q' parameter")]
    EmptyQuery,
    #[error("unknown mode: {0}")]
    UnknownMode(String),
    #[error("generation queue is full, try again later")]
    Overloaded,
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("model load failed: {0}")]
    ModelLoad(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::EmptyQuery | ServiceError::UnknownMode(_) => StatusCode::BAD_REQUEST,
            ServiceError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            // ModelLoad aborts startup and is never served in practice.
            ServiceError::Generation(_)
            | ServiceError::ModelLoad(_)
            | ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
