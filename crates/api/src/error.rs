//! API error types with HTTP response mapping.

use application::AppError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ErrorKind;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No route matched the request.
    NotFound(String),
    /// A use case failed.
    App(AppError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::App(err) => app_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn app_error_to_response(err: AppError) -> (StatusCode, String) {
    match err.kind() {
        Some(ErrorKind::Validation) => (StatusCode::BAD_REQUEST, err.to_string()),
        Some(ErrorKind::NotFound) => (StatusCode::NOT_FOUND, err.to_string()),
        Some(ErrorKind::InvalidState) => (StatusCode::CONFLICT, err.to_string()),
        None if err.is_conflict() => (StatusCode::CONFLICT, err.to_string()),
        None => internal(err.to_string()),
    }
}

fn internal(msg: String) -> (StatusCode, String) {
    tracing::error!(error = %msg, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderError, OrderNumber};
    use store::{AggregateId, StoreError, Version};

    fn status_of(err: AppError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_domain_errors_map_by_kind() {
        let number = OrderNumber::parse("20240101000-00001").unwrap();

        assert_eq!(
            status_of(OrderError::ClientNameRequired.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                OrderError::OrderNotFound {
                    order_number: number.clone()
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                OrderError::NoItems {
                    order_number: number
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_storage_errors() {
        assert_eq!(
            status_of(
                StoreError::ConcurrencyConflict {
                    order_id: AggregateId::new(),
                    expected: Version::first(),
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::Unavailable("connection reset".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found() {
        assert_eq!(
            ApiError::NotFound("gone".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
