//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`, and every error body is JSON.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::orders::OrderError;
use crate::services::stock::{StockError, StockShortfall};

/// Body returned for every 401.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Application-level error type for the orders API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A variant cannot cover the requested quantity.
    #[error("{0}")]
    InsufficientStock(Box<StockShortfall>),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

/// JSON body for a stock shortfall: the message plus the variant detail.
#[derive(Debug, Serialize)]
struct ShortfallResponse<'a> {
    error: String,
    #[serde(flatten)]
    detail: &'a StockShortfall,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InsufficientStock(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        match &self {
            Self::InsufficientStock(shortfall) => {
                let body = ShortfallResponse {
                    error: shortfall.to_string(),
                    detail: shortfall,
                };
                (status, Json(body)).into_response()
            }
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => (
                status,
                Json(ErrorResponse {
                    error: "Internal server error",
                }),
            )
                .into_response(),
            _ => {
                let message = self.to_string();
                (status, Json(ErrorResponse { error: &message })).into_response()
            }
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient(shortfall) => Self::InsufficientStock(shortfall),
            StockError::ProductNotFound(_) | StockError::InvalidQuantity(_) => {
                Self::BadRequest(err.to_string())
            }
            StockError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Stock(e) => e.into(),
            OrderError::NegativeTotal | OrderError::AmountOutOfRange => {
                Self::BadRequest(err.to_string())
            }
            OrderError::Repository(e) => Self::Database(e),
            OrderError::OrderNumberExhausted | OrderError::Vanished(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractor so errors are associated with the caller.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("orders", "Order placed", Some(&[("order_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tindahan_core::ProductId;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Address not found".to_string());
        assert_eq!(err.to_string(), "Address not found");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::BadRequest("test".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("test".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Database(RepositoryError::NotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let (status, body) = body_json(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (status, body) = body_json(AppError::Database(RepositoryError::DataCorruption(
            "secret detail".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_shortfall_body_carries_detail() {
        let err: AppError = StockError::Insufficient(Box::new(StockShortfall {
            product_id: ProductId::new(3),
            product_name: "Barong".to_string(),
            color: "red".to_string(),
            size: "M".to_string(),
            available: 1,
            requested: 4,
            shortfall: 3,
        }))
        .into();

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["product_id"], 3);
        assert_eq!(body["available"], 1);
        assert_eq!(body["requested"], 4);
        assert_eq!(body["shortfall"], 3);
        assert_eq!(
            body["error"],
            "Insufficient stock for Barong (red/M): 1 available, 4 requested"
        );
    }

    #[test]
    fn test_order_errors_map_to_status() {
        assert_eq!(
            AppError::from(OrderError::NegativeTotal).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(OrderError::AmountOutOfRange).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(OrderError::Stock(StockError::ProductNotFound(ProductId::new(
                9
            ))))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(OrderError::OrderNumberExhausted).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
