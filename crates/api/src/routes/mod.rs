//! HTTP route handlers for the orders API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Liveness check
//! GET    /health/ready          - Readiness check (database)
//!
//! # Orders (requires auth)
//! GET    /orders[?id=]          - List the caller's orders, or get one
//! POST   /orders                - Place an order
//! PUT    /orders?id=            - Update status / tracking number
//!
//! # Addresses (requires auth)
//! GET    /addresses             - List the caller's addresses
//! POST   /addresses             - Create an address
//! PUT    /addresses[?id=]       - Update an address (id in body or query)
//! DELETE /addresses?id=         - Delete an address
//!
//! # Products (requires auth)
//! PUT    /products/{id}/stock   - Decrement one variant's stock
//! ```

pub mod addresses;
pub mod orders;
pub mod products;

use axum::{Json, Router, extract::rejection::JsonRejection};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(orders::router())
        .merge(addresses::router())
        .merge(products::router())
}

/// `?id=` query parameter, kept as text so a bad value becomes a 400 with a
/// JSON body instead of the framework's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Unwrap a JSON body, turning framework rejections into a JSON 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Parse a required id, reporting `what` when it is absent or malformed.
pub(crate) fn require_id<T: std::str::FromStr>(
    raw: Option<&str>,
    what: &str,
) -> Result<T, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{what} ID is required")))?;

    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what.to_lowercase())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Router harness for handler tests.
    //!
    //! The pool connects lazily and no test here reaches the database: every
    //! request is rejected by authentication or validation first.

    use axum::{
        Router,
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use chrono::Duration;
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use tindahan_core::UserId;

    use crate::config::ApiConfig;
    use crate::services::auth::{Claims, issue_token};
    use crate::state::AppState;

    pub fn app() -> Router {
        let config = ApiConfig::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tindahan_test")
            .unwrap();
        super::router().with_state(AppState::new(config, pool))
    }

    pub fn bearer() -> String {
        let claims = Claims::new(UserId::new(1), "buyer@example.ph", Duration::hours(1));
        let token = issue_token(&ApiConfig::for_tests().jwt_secret, &claims).unwrap();
        format!("Bearer {token}")
    }

    pub fn request(method: &str, uri: &str, auth: bool, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if auth {
            builder = builder.header(header::AUTHORIZATION, bearer());
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_owned()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response: Response<Body> = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tindahan_core::OrderId;

    #[test]
    fn test_require_id_parses() {
        let id: OrderId = require_id(Some(" 12 "), "Order").unwrap_or_else(|_| OrderId::new(0));
        assert_eq!(id, OrderId::new(12));
    }

    #[test]
    fn test_require_id_missing() {
        let err = require_id::<OrderId>(None, "Order").unwrap_err();
        assert_eq!(err.to_string(), "Order ID is required");

        let err = require_id::<OrderId>(Some("  "), "Order").unwrap_err();
        assert_eq!(err.to_string(), "Order ID is required");
    }

    #[test]
    fn test_require_id_malformed() {
        let err = require_id::<OrderId>(Some("abc"), "Address").unwrap_err();
        assert_eq!(err.to_string(), "Invalid address ID");
    }
}
