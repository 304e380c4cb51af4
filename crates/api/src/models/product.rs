//! Product data as seen by the order workflow.

use tindahan_core::{Money, ProductId};

/// A product row read under lock while an order or stock adjustment runs.
///
/// `variants` is kept as the raw stored text; parsing is tolerant and
/// happens in `services::stock`.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub variants: Option<String>,
    pub stock_quantity: i32,
}
