//! Order repository for database operations.
//!
//! Reads hydrate each order with its line items in a second query. Inserts
//! take a caller-owned connection so the order workflow can run them inside
//! its transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::value::RawValue;
use sqlx::{PgConnection, PgPool};

use tindahan_core::{Money, OrderId, OrderItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{
    DEFAULT_ORDER_STATUS, DEFAULT_PAYMENT_STATUS, NewOrder, NewOrderItem, Order, OrderItem,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, payment_method, \
     customer_email, subtotal, tax_amount, shipping_amount, discount_amount, total_amount, \
     shipping_address, tracking_number, notes, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: Option<i32>,
    status: String,
    payment_status: String,
    payment_method: Option<String>,
    customer_email: String,
    subtotal: Money,
    tax_amount: Money,
    shipping_amount: Money,
    discount_amount: Money,
    total_amount: Money,
    shipping_address: Option<String>,
    tracking_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        let shipping_address = parse_shipping_address(self.id, self.shipping_address);
        Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            user_id: self.user_id.map(UserId::new),
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            customer_email: self.customer_email,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            shipping_amount: self.shipping_amount,
            discount_amount: self.discount_amount,
            total_amount: self.total_amount,
            shipping_address,
            tracking_number: self.tracking_number,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    quantity: i32,
    price: Money,
    size: String,
    color: String,
    product_name: Option<String>,
    product_brand: Option<String>,
    product_image: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            price: row.price,
            size: row.size,
            color: row.color,
            product_name: row.product_name,
            product_brand: row.product_brand,
            product_image: row.product_image,
        }
    }
}

/// Wrap the stored shipping address text as raw JSON, exactly as written.
///
/// Rows written by older clients sometimes hold plain text; those are
/// returned as a JSON string rather than failing the whole listing.
fn parse_shipping_address(order_id: i32, raw: Option<String>) -> Option<Box<RawValue>> {
    let raw = raw?;
    RawValue::from_string(raw.clone())
        .or_else(|e| {
            tracing::warn!(order_id, error = %e, "stored shipping address is not valid JSON");
            serde_json::value::to_raw_value(&raw)
        })
        .ok()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's orders, newest first, each with its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for_orders(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect())
    }

    /// Get one of the user's orders with its line items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self
            .items_for_orders(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();

        Ok(Some(row.into_order(items)))
    }

    /// Update an order's status and tracking number.
    ///
    /// The tracking number is kept when `tracking_number` is `None`.
    ///
    /// # Returns
    ///
    /// Returns `false` when no order with that id belongs to the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        user_id: UserId,
        id: OrderId,
        status: &str,
        tracking_number: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.orders
            SET status = $1,
                tracking_number = COALESCE($2, tracking_number),
                updated_at = NOW()
            WHERE id = $3 AND user_id = $4
            ",
        )
        .bind(status)
        .bind(tracking_number)
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert an order header.
    ///
    /// Returns `None` if the order number is already taken, leaving the
    /// transaction usable so the caller can retry with a fresh number.
    ///
    /// The shipping address is stored as the client's JSON text, unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_order(
        conn: &mut PgConnection,
        order: &NewOrder,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r"
            INSERT INTO shop.orders
                (order_number, user_id, status, payment_status, payment_method, customer_email,
                 subtotal, tax_amount, shipping_amount, discount_amount, total_amount,
                 shipping_address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(DEFAULT_ORDER_STATUS)
        .bind(DEFAULT_PAYMENT_STATUS)
        .bind(order.payment_method.as_deref())
        .bind(&order.customer_email)
        .bind(order.totals.subtotal)
        .bind(order.totals.tax_amount)
        .bind(order.totals.shipping_amount)
        .bind(order.totals.discount_amount)
        .bind(order.totals.total_amount)
        .bind(order.shipping_address.as_deref().map(RawValue::get))
        .bind(order.notes.as_deref())
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|(id,)| OrderId::new(id)))
    }

    /// Insert one line item for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_item(
        conn: &mut PgConnection,
        order_id: OrderId,
        item: &NewOrderItem,
    ) -> Result<OrderItemId, RepositoryError> {
        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO shop.order_items (order_id, product_id, quantity, price, size, color)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price)
        .bind(&item.size)
        .bind(&item.color)
        .fetch_one(conn)
        .await?;

        Ok(OrderItemId::new(id))
    }

    async fn items_for_orders(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<OrderItem>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price, oi.size, oi.color,
                   p.name AS product_name,
                   p.brand AS product_brand,
                   p.image_url AS product_image
            FROM shop.order_items oi
            LEFT JOIN shop.products p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool)
        .await?;

        let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(raw: Option<Box<RawValue>>) -> Option<String> {
        raw.map(|r| r.get().to_owned())
    }

    #[test]
    fn test_parse_shipping_address_keeps_exact_text() {
        let stored = r#"{"first_name":"Ana","city":"Cebu","postal_code":"6000","lat":10.30}"#;
        assert_eq!(
            text(parse_shipping_address(1, Some(stored.to_owned()))).as_deref(),
            Some(stored)
        );
    }

    #[test]
    fn test_parse_shipping_address_missing_is_none() {
        assert!(parse_shipping_address(1, None).is_none());
    }

    #[test]
    fn test_parse_shipping_address_plain_text_survives() {
        let raw = Some("123 Rizal St, Manila".to_string());
        assert_eq!(
            text(parse_shipping_address(1, raw)).as_deref(),
            Some(r#""123 Rizal St, Manila""#)
        );
    }
}
