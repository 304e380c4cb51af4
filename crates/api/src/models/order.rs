//! Order domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tindahan_core::{Email, Money, OrderId, OrderItemId, ProductId, UserId};

/// Status assigned to every new order.
pub const DEFAULT_ORDER_STATUS: &str = "pending";
/// Payment status assigned to every new order.
pub const DEFAULT_PAYMENT_STATUS: &str = "pending";

/// An order with its line items, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub customer_email: String,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
    /// Stored as JSON text and returned verbatim, so key order and number
    /// formatting match what the client sent.
    pub shipping_address: Option<Box<serde_json::value::RawValue>>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A line item joined with display fields from its product.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Money,
    pub size: String,
    pub color: String,
    pub product_name: Option<String>,
    pub product_brand: Option<String>,
    pub product_image: Option<String>,
}

/// Header values for an order insert.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub payment_method: Option<String>,
    pub customer_email: Email,
    pub totals: OrderTotals,
    pub shipping_address: Option<Box<serde_json::value::RawValue>>,
    pub notes: Option<String>,
}

/// A priced line item ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price: Money,
    pub size: String,
    pub color: String,
}

/// Why order totals could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsError {
    /// The discount exceeds subtotal, tax and shipping combined.
    NegativeTotal,
    /// An intermediate or final amount does not fit `NUMERIC(12,2)`.
    OutOfRange,
}

/// Monetary breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl OrderTotals {
    /// Derive totals from priced line items and order-level adjustments.
    ///
    /// # Errors
    ///
    /// Returns `TotalsError::NegativeTotal` when the discount would push the
    /// total below zero and `TotalsError::OutOfRange` when any amount
    /// overflows or cannot be stored.
    pub fn compute(
        items: &[NewOrderItem],
        tax_amount: Money,
        shipping_amount: Money,
        discount_amount: Money,
    ) -> Result<Self, TotalsError> {
        let line_totals = items
            .iter()
            .map(|item| item.price.checked_mul(item.quantity))
            .collect::<Option<Vec<_>>>()
            .ok_or(TotalsError::OutOfRange)?;
        let subtotal = Money::checked_sum(line_totals).ok_or(TotalsError::OutOfRange)?;

        let total_amount = subtotal
            .checked_add(tax_amount)
            .and_then(|t| t.checked_add(shipping_amount))
            .and_then(|t| t.checked_sub(discount_amount))
            .ok_or(TotalsError::OutOfRange)?
            .rounded();
        if total_amount.is_negative() {
            return Err(TotalsError::NegativeTotal);
        }

        let stored = [subtotal, tax_amount, shipping_amount, discount_amount, total_amount];
        if !stored.iter().all(Money::is_storable) {
            return Err(TotalsError::OutOfRange);
        }

        Ok(Self {
            subtotal: subtotal.rounded(),
            tax_amount,
            shipping_amount,
            discount_amount,
            total_amount,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(price: i64, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(1),
            quantity,
            price: Money::from_units(price),
            size: "M".to_string(),
            color: "red".to_string(),
        }
    }

    #[test]
    fn test_totals_sum_line_items() {
        let totals = OrderTotals::compute(
            &[item(500, 2), item(120, 1)],
            Money::ZERO,
            Money::ZERO,
            Money::ZERO,
        );
        let totals = totals.map(|t| (t.subtotal, t.total_amount));
        assert_eq!(
            totals,
            Ok((Money::from_units(1120), Money::from_units(1120)))
        );
    }

    #[test]
    fn test_totals_apply_adjustments() {
        let totals = OrderTotals::compute(
            &[item(500, 2)],
            Money::from_units(120),
            Money::from_units(80),
            Money::from_units(200),
        );
        assert_eq!(totals.map(|t| t.total_amount), Ok(Money::from_units(1000)));
    }

    #[test]
    fn test_totals_reject_excess_discount() {
        let totals = OrderTotals::compute(
            &[item(100, 1)],
            Money::ZERO,
            Money::ZERO,
            Money::from_units(101),
        );
        assert_eq!(totals, Err(TotalsError::NegativeTotal));
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        let huge: Money = serde_json::from_str("\"79228162514264337593543950335\"").unwrap();
        let totals = OrderTotals::compute(&[item(100, 1)], huge, huge, Money::ZERO);
        assert_eq!(totals, Err(TotalsError::OutOfRange));

        let mut pricey = item(1, 2);
        pricey.price = huge;
        let totals = OrderTotals::compute(&[pricey], Money::ZERO, Money::ZERO, Money::ZERO);
        assert_eq!(totals, Err(TotalsError::OutOfRange));
    }

    #[test]
    fn test_totals_beyond_column_range() {
        let totals = OrderTotals::compute(
            &[item(5_000_000_000, 2), item(1, 1)],
            Money::ZERO,
            Money::ZERO,
            Money::ZERO,
        );
        assert_eq!(totals, Err(TotalsError::OutOfRange));

        let totals = OrderTotals::compute(
            &[item(5_000_000_000, 1)],
            Money::from_units(4_999_999_999),
            Money::ZERO,
            Money::ZERO,
        );
        assert!(totals.is_ok());
    }
}
