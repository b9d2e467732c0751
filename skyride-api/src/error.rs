use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use skyride_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    Core(CoreError),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::Core(err) => match err {
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION", msg),
                // Malformed flight input reads as plain validation to callers
                CoreError::Rejected(rejection) if rejection.is_input_error() => {
                    (StatusCode::BAD_REQUEST, "VALIDATION", rejection.to_string())
                }
                CoreError::Rejected(rejection) => {
                    (StatusCode::BAD_REQUEST, rejection.code(), rejection.to_string())
                }
                CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                err @ CoreError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, err.code(), err.to_string())
                }
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
                CoreError::Infrastructure(msg) => {
                    tracing::error!("Internal Server Error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INFRASTRUCTURE",
                        "Internal Server Error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
