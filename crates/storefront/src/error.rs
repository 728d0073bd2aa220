//! Unified error handling with Sentry integration.
//!
//! Most external failures are converted into view state where they happen;
//! `AppError` covers what is left: malformed requests and upstream failures
//! on endpoints that have nothing sensible to render instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::ApiError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// External API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The cart cookies cannot hold another line item.
    #[error("Cart is full")]
    CartFull,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Api(ApiError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::CartFull => StatusCode::CONFLICT,
        };

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Api(ApiError::NotFound(_)) => "Not found".to_string(),
            Self::Api(_) => "External service error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after login or when a credential is seen.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a cart or auth action.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid product id".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid product id");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AppError::CartFull), StatusCode::CONFLICT);
        assert_eq!(
            status(AppError::Api(ApiError::NotFound("/products/9".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(AppError::Api(ApiError::Api {
                status: 500,
                message: String::new()
            })),
            StatusCode::BAD_GATEWAY
        );
    }
}
