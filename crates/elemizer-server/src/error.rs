use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use elemizer_core::error::AppError;

use crate::dto::{ErrorMessageResponse, ValidationErrorResponse};

/// Wrapper so we can implement `IntoResponse` for `AppError`.
///
/// Validation failures become `validation-error` (422); everything else becomes
/// `error-message` (400) carrying only the user-facing message. Details stay in the logs.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                axum::Json(ValidationErrorResponse::new(errors.into_fields())),
            )
                .into_response(),
            err => {
                if err.is_fetch_error() || matches!(err, AppError::BadRequest(_)) {
                    tracing::warn!(error = %err, "Request failed");
                } else {
                    tracing::error!(error = %err, "Request failed");
                }
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(ErrorMessageResponse::new(err.client_message())),
                )
                    .into_response()
            }
        }
    }
}
