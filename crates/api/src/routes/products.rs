//! Product stock route handlers.
//!
//! Errors on this route use `{"message": ...}` bodies, which is what stock
//! clients read, rather than the `{"error": ...}` shape used elsewhere.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::put,
};
use serde::{Deserialize, Serialize};

use tindahan_core::ProductId;

use crate::middleware::RequireAuth;
use crate::services::stock::{StockError, StockShortfall, adjust_stock};
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new().route("/products/{id}/stock", put(update_stock))
}

/// Body of `PUT /products/{id}/stock`.
#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: Option<i32>,
}

/// Successful stock adjustment.
#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub message: &'static str,
    pub product_id: ProductId,
    pub color: String,
    pub size: String,
    pub remaining: i32,
}

/// Errors returned by the stock route.
#[derive(Debug)]
pub enum StockRouteError {
    BadRequest(String),
    Stock(StockError),
}

impl From<StockError> for StockRouteError {
    fn from(err: StockError) -> Self {
        Self::Stock(err)
    }
}

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

#[derive(Serialize)]
struct ShortfallBody<'a> {
    message: String,
    #[serde(flatten)]
    detail: &'a StockShortfall,
}

impl IntoResponse for StockRouteError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(MessageBody { message })).into_response()
            }
            Self::Stock(StockError::Insufficient(shortfall)) => (
                StatusCode::BAD_REQUEST,
                Json(ShortfallBody {
                    message: shortfall.to_string(),
                    detail: &shortfall,
                }),
            )
                .into_response(),
            Self::Stock(err @ StockError::InvalidQuantity(_)) => (
                StatusCode::BAD_REQUEST,
                Json(MessageBody {
                    message: err.to_string(),
                }),
            )
                .into_response(),
            Self::Stock(err @ StockError::ProductNotFound(_)) => (
                StatusCode::NOT_FOUND,
                Json(MessageBody {
                    message: err.to_string(),
                }),
            )
                .into_response(),
            Self::Stock(err @ StockError::Repository(_)) => {
                let event_id = sentry::capture_error(&err);
                tracing::error!(error = %err, sentry_event_id = %event_id, "Stock update failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(MessageBody {
                        message: "Internal server error".to_owned(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// Decrement one variant of a product.
///
/// # Errors
///
/// Returns 400 for bad input or insufficient stock, 404 for unknown products.
pub async fn update_stock(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<StockRequest>, JsonRejection>,
) -> Result<Json<StockResponse>, StockRouteError> {
    let product_id: ProductId = raw_id
        .parse()
        .map_err(|_| StockRouteError::BadRequest("Invalid product ID".to_owned()))?;

    let Json(request) =
        payload.map_err(|rejection| StockRouteError::BadRequest(rejection.body_text()))?;

    let (Some(color), Some(size), Some(quantity)) = (
        request.color.filter(|c| !c.trim().is_empty()),
        request.size.filter(|s| !s.trim().is_empty()),
        request.quantity,
    ) else {
        return Err(StockRouteError::BadRequest(
            "color, size and quantity are required".to_owned(),
        ));
    };

    let adjustment = adjust_stock(state.pool(), product_id, color.trim(), size.trim(), quantity)
        .await?;

    tracing::debug!(user_id = %user.id, %product_id, "stock adjusted by caller");

    Ok(Json(StockResponse {
        message: "Stock updated successfully",
        product_id: adjustment.product_id,
        color: adjustment.color,
        size: adjustment.size,
        remaining: adjustment.remaining,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{request, send};
    use serde_json::json;

    #[tokio::test]
    async fn test_requires_auth() {
        let body = json!({"color": "red", "size": "M", "quantity": 1}).to_string();
        let (status, body) = send(request("PUT", "/products/1/stock", false, Some(&body))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_rejects_bad_product_id() {
        let body = json!({"color": "red", "size": "M", "quantity": 1}).to_string();
        let (status, body) = send(request("PUT", "/products/abc/stock", true, Some(&body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Invalid product ID"}));
    }

    #[tokio::test]
    async fn test_rejects_missing_fields() {
        let body = json!({"color": "red", "quantity": 1}).to_string();
        let (status, body) = send(request("PUT", "/products/1/stock", true, Some(&body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"message": "color, size and quantity are required"})
        );
    }

    #[test]
    fn test_shortfall_status() {
        let err = StockRouteError::Stock(StockError::Insufficient(Box::new(StockShortfall {
            product_id: ProductId::new(1),
            product_name: "Barong".to_owned(),
            color: "red".to_owned(),
            size: "M".to_owned(),
            available: 0,
            requested: 1,
            shortfall: 1,
        })));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_status() {
        let response =
            StockRouteError::Stock(StockError::ProductNotFound(ProductId::new(5))).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
