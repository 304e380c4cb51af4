//! Order placement workflow.
//!
//! Placement runs as one transaction:
//!
//! 1. Lock every referenced product (`FOR UPDATE`, ascending id)
//! 2. Reserve stock for every line item in memory
//! 3. Write the decremented stock back
//! 4. Insert the order header (retrying on order-number collision)
//! 5. Insert the line items
//! 6. Commit, then re-read the hydrated order
//!
//! Any failure before commit rolls everything back.

use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::PgPool;
use thiserror::Error;

use tindahan_core::{Email, Money, OrderId, ProductId};

use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::order::{NewOrder, NewOrderItem, OrderTotals, TotalsError};
use crate::models::{CurrentUser, Order};
use crate::services::stock::{StockError, StockLedger};

/// How many order numbers to try before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error("Discount exceeds the order amount")]
    NegativeTotal,

    #[error("Order amount is out of range")]
    AmountOutOfRange,

    #[error("could not allocate a unique order number")]
    OrderNumberExhausted,

    #[error("order {0} vanished after commit")]
    Vanished(OrderId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// One requested line item, already shape-validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemDraft {
    pub product_id: ProductId,
    pub quantity: i32,
    pub color: String,
    pub size: String,
    /// Price the client displayed; informational only.
    pub client_price: Option<Money>,
}

/// A validated order request.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub items: Vec<LineItemDraft>,
    pub customer_email: Email,
    /// Total the client computed; informational only.
    pub client_total: Money,
    pub shipping_address: Option<Box<serde_json::value::RawValue>>,
    pub payment_method: Option<String>,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub notes: Option<String>,
}

impl OrderDraft {
    /// Distinct product ids in ascending order (the lock order).
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|item| item.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Build an order number from a prefix, a millisecond timestamp and a
/// random suffix.
#[must_use]
pub fn format_order_number(prefix: &str, epoch_millis: u128, suffix: u16) -> String {
    format!("{prefix}{epoch_millis}-{suffix:04X}")
}

fn next_order_number(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format_order_number(prefix, millis, rand::random::<u16>())
}

/// Reserve stock for every line item and price it from the product record.
///
/// # Errors
///
/// Returns `StockError` for the first item that cannot be satisfied; the
/// ledger may hold partial reservations but nothing has been written.
pub fn price_line_items(
    ledger: &mut StockLedger,
    items: &[LineItemDraft],
) -> Result<Vec<NewOrderItem>, StockError> {
    let mut priced = Vec::with_capacity(items.len());

    for item in items {
        ledger.reserve(item.product_id, &item.color, &item.size, item.quantity)?;

        let product = ledger
            .product(item.product_id)
            .ok_or(StockError::ProductNotFound(item.product_id))?;

        if let Some(client_price) = item.client_price
            && client_price != product.price
        {
            tracing::warn!(
                product_id = %item.product_id,
                client_price = %client_price,
                catalog_price = %product.price,
                "client price differs from catalog; using catalog price"
            );
        }

        priced.push(NewOrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            price: product.price,
            size: item.size.clone(),
            color: item.color.clone(),
        });
    }

    Ok(priced)
}

/// Service that places orders.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    order_number_prefix: &'a str,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, order_number_prefix: &'a str) -> Self {
        Self {
            pool,
            order_number_prefix,
        }
    }

    /// Place an order for `user`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Stock` when a product is missing or a variant is
    /// short, `OrderError::NegativeTotal` when the discount exceeds the
    /// amount due, `OrderError::AmountOutOfRange` when an amount overflows or
    /// exceeds the stored range, and `OrderError::Repository` on database
    /// failures. No stock or order rows are written when any error is returned.
    #[tracing::instrument(skip(self, draft), fields(user_id = %user.id, items = draft.items.len()))]
    pub async fn place(&self, user: &CurrentUser, draft: OrderDraft) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let products = ProductRepository::lock_for_update(&mut tx, &draft.product_ids()).await?;
        let mut ledger = StockLedger::new(products);
        let items = price_line_items(&mut ledger, &draft.items)?;

        let totals = OrderTotals::compute(
            &items,
            draft.tax_amount,
            draft.shipping_amount,
            draft.discount_amount,
        )
        .map_err(|e| match e {
            TotalsError::NegativeTotal => OrderError::NegativeTotal,
            TotalsError::OutOfRange => OrderError::AmountOutOfRange,
        })?;

        if totals.total_amount != draft.client_total.rounded() {
            tracing::warn!(
                client_total = %draft.client_total,
                computed_total = %totals.total_amount,
                "client total differs from computed total; using computed total"
            );
        }

        ledger.persist(&mut tx).await?;

        let mut new_order = NewOrder {
            order_number: next_order_number(self.order_number_prefix),
            user_id: user.id,
            payment_method: draft.payment_method,
            customer_email: draft.customer_email,
            totals,
            shipping_address: draft.shipping_address,
            notes: draft.notes,
        };

        let mut order_id = None;
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            order_id = OrderRepository::insert_order(&mut tx, &new_order).await?;
            if order_id.is_some() {
                break;
            }
            tracing::warn!(order_number = %new_order.order_number, "order number collision");
            new_order.order_number = next_order_number(self.order_number_prefix);
        }
        let order_id = order_id.ok_or(OrderError::OrderNumberExhausted)?;

        for item in &items {
            OrderRepository::insert_item(&mut tx, order_id, item).await?;
        }

        tx.commit().await?;

        tracing::info!(
            %order_id,
            order_number = %new_order.order_number,
            total = %totals.total_amount,
            "order placed"
        );

        OrderRepository::new(self.pool)
            .get_for_user(user.id, order_id)
            .await?
            .ok_or(OrderError::Vanished(order_id))
    }
}
