use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nd_core::Error;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        if error.is_not_found() {
            ApiError::NotFound("Article not found".to_string())
        } else if error.is_unsupported_language() {
            ApiError::BadRequest("Unsupported language".to_string())
        } else {
            ApiError::Internal(error)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(error) => {
                tracing::error!("Request failed: {}", error);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
