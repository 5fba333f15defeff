use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid action")]
    InvalidAction,

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Unknown action and malformed dates are the only failures surfaced
        // to clients; upstream trouble degrades to default views before it
        // reaches this type.
        let status = match self {
            ApiError::InvalidAction => StatusCode::BAD_REQUEST,
            ApiError::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
