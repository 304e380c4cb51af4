//! Order route handlers.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use serde_json::value::RawValue;

use tindahan_core::{Email, Money, OrderId, ProductId};

use super::{IdQuery, json_body, require_id};
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order};
use crate::services::orders::{LineItemDraft, OrderDraft, OrderService};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/orders",
        get(list_orders).post(create_order).put(update_order_status),
    )
}

// =============================================================================
// Request Types
// =============================================================================

/// One line item as sent by the client.
#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i32>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub price: Option<Money>,
}

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Option<Vec<LineItemRequest>>,
    pub total: Option<Money>,
    pub customer_email: Option<String>,
    /// Kept as the client's JSON text; `null` reads as absent.
    pub shipping_address: Option<Box<RawValue>>,
    pub payment_method: Option<String>,
    pub tax_amount: Option<Money>,
    pub shipping_amount: Option<Money>,
    pub discount_amount: Option<Money>,
    pub notes: Option<String>,
    /// Deprecated. Identity comes from the bearer credential.
    pub user_id: Option<Value>,
}

/// Body of `PUT /orders?id=`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub tracking_number: Option<String>,
}

impl CreateOrderRequest {
    /// Check required fields and shape the request into an [`OrderDraft`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first problem found.
    pub fn into_draft(self) -> Result<OrderDraft> {
        let items = self
            .items
            .filter(|items| !items.is_empty())
            .ok_or_else(|| AppError::BadRequest("Order must contain at least one item".into()))?;

        let client_total = self
            .total
            .ok_or_else(|| AppError::BadRequest("Order total is required".into()))?;

        let customer_email = self
            .customer_email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Customer email is required".into()))?;
        let customer_email = Email::parse(&customer_email)
            .map_err(|e| AppError::BadRequest(format!("Invalid customer email: {e}")))?;

        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.into_draft(index))
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderDraft {
            items,
            customer_email,
            client_total,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            tax_amount: order_amount(self.tax_amount, "tax_amount")?,
            shipping_amount: order_amount(self.shipping_amount, "shipping_amount")?,
            discount_amount: order_amount(self.discount_amount, "discount_amount")?,
            notes: self.notes,
        })
    }
}

impl LineItemRequest {
    fn into_draft(self, index: usize) -> Result<LineItemDraft> {
        let position = index + 1;
        let product_id = self
            .product_id
            .ok_or_else(|| AppError::BadRequest(format!("Item {position} is missing product_id")))?;

        let quantity = self.quantity.unwrap_or(0);
        if quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "Item {position} quantity must be at least 1"
            )));
        }

        let color = required_text(self.color)
            .ok_or_else(|| AppError::BadRequest(format!("Item {position} is missing color")))?;
        let size = required_text(self.size)
            .ok_or_else(|| AppError::BadRequest(format!("Item {position} is missing size")))?;

        Ok(LineItemDraft {
            product_id,
            quantity,
            color,
            size,
            client_price: self.price,
        })
    }
}

fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// An order-level adjustment: absent is zero, never negative, and within
/// what the amount columns store.
fn order_amount(amount: Option<Money>, field: &str) -> Result<Money> {
    let amount = amount.unwrap_or(Money::ZERO);
    if amount.is_negative() {
        return Err(AppError::BadRequest(format!("{field} cannot be negative")));
    }
    if !amount.is_storable() {
        return Err(AppError::BadRequest(format!("{field} is out of range")));
    }
    Ok(amount)
}

/// Log when a client still sends a `user_id` that disagrees with its token.
fn check_claimed_user(claimed: Option<&Value>, user: &CurrentUser) {
    let Some(claimed) = claimed.filter(|v| !v.is_null()) else {
        return;
    };

    let claimed_id = match claimed {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    if claimed_id != Some(i64::from(user.id.as_i32())) {
        tracing::warn!(
            user_id = %user.id,
            claimed_user_id = %claimed,
            "ignoring client-supplied user_id that differs from the authenticated caller"
        );
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List the caller's orders, or fetch one with `?id=`.
///
/// # Errors
///
/// Returns 404 when `id` does not name one of the caller's orders.
pub async fn list_orders(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> Result<Response> {
    let repo = OrderRepository::new(state.pool());

    if let Some(raw) = query.id.as_deref() {
        let id: OrderId = require_id(Some(raw), "Order")?;
        let order = repo
            .get_for_user(user.id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
        return Ok(Json(order).into_response());
    }

    let orders = repo.list_for_user(user.id).await?;
    Ok(Json(orders).into_response())
}

/// Place an order.
///
/// # Errors
///
/// Returns 400 for invalid input, missing products or insufficient stock.
pub async fn create_order(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let request = json_body(payload)?;
    check_claimed_user(request.user_id.as_ref(), &user);
    let draft = request.into_draft()?;

    let service = OrderService::new(state.pool(), &state.config().order_number_prefix);
    let order = service.place(&user, draft).await?;

    let data = [("order_number", order.order_number.as_str())];
    add_breadcrumb("orders", "Order placed", Some(data.as_slice()));

    Ok((StatusCode::CREATED, Json(order)))
}

/// Update an order's status and tracking number.
///
/// # Errors
///
/// Returns 400 without `id` or `status`, 404 when the order is not the caller's.
pub async fn update_order_status(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let id: OrderId = require_id(query.id.as_deref(), "Order")?;
    let request = json_body(payload)?;
    let status = required_text(request.status)
        .ok_or_else(|| AppError::BadRequest("Status is required".into()))?;

    let repo = OrderRepository::new(state.pool());
    let updated = repo
        .update_status(user.id, id, &status, request.tracking_number.as_deref())
        .await?;
    if !updated {
        return Err(AppError::NotFound("Order not found or unauthorized".into()));
    }

    tracing::info!(order_id = %id, %status, "order status updated");

    repo.get_for_user(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found or unauthorized".into()))
}
