use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tessera_core::AppError;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    error: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::MissingField(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let payload = Json(ErrorResponse {
            error: self.0.to_string(),
        });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tessera_core::AppError;

    use super::{ErrorResponse, status_for};

    #[test]
    fn missing_field_maps_to_bad_request() {
        let status = status_for(&AppError::MissingField("role_name".to_owned()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let status = status_for(&AppError::NotFound("role".to_owned()));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        let status = status_for(&AppError::Conflict("membership".to_owned()));
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn body_uses_the_error_key() {
        let payload = ErrorResponse {
            error: "validation error: title must not be empty".to_owned(),
        };
        let encoded = serde_json::to_value(&payload);
        assert!(
            encoded.is_ok_and(|value| value.get("error").is_some_and(serde_json::Value::is_string))
        );
    }
}
