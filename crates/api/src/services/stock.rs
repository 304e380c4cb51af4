//! Variant stock reservation over locked product rows.
//!
//! A [`StockLedger`] is built from products locked with `SELECT ... FOR
//! UPDATE`. Reservations are checked and applied in memory first; nothing is
//! written until [`StockLedger::persist`] runs, so a failed reservation
//! leaves the database untouched once the transaction rolls back.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use tindahan_core::{ProductId, StockError as VariantError, VariantStock};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::ProductSnapshot;

/// Details of a variant that cannot cover a requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub available: i32,
    pub requested: i32,
    pub shortfall: i32,
}

impl std::fmt::Display for StockShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Insufficient stock for {} ({}/{}): {} available, {} requested",
            self.product_name, self.color, self.size, self.available, self.requested
        )
    }
}

/// Errors raised while reserving stock.
#[derive(Debug, Error)]
pub enum StockError {
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("{0}")]
    Insufficient(Box<StockShortfall>),

    #[error("Quantity must be at least 1 (got {0})")]
    InvalidQuantity(i32),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StockError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Result of a standalone stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub color: String,
    pub size: String,
    pub remaining: i32,
}

struct LedgerEntry {
    product: ProductSnapshot,
    stock: VariantStock,
    units_removed: i32,
}

/// In-memory stock book for a set of locked products.
pub struct StockLedger {
    entries: BTreeMap<ProductId, LedgerEntry>,
}

impl StockLedger {
    /// Build a ledger from locked product rows.
    ///
    /// Corrupt `variants` text counts as no stock; a warning names the product
    /// so the row can be found and repaired.
    #[must_use]
    pub fn new(products: Vec<ProductSnapshot>) -> Self {
        let entries = products
            .into_iter()
            .map(|product| {
                let stock = parse_variants_lenient(&product);
                (
                    product.id,
                    LedgerEntry {
                        product,
                        stock,
                        units_removed: 0,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// The locked product with this id, if it exists.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&ProductSnapshot> {
        self.entries.get(&id).map(|entry| &entry.product)
    }

    /// Reserve `quantity` units of a variant and return what remains.
    ///
    /// Reservations against the same variant accumulate.
    ///
    /// # Errors
    ///
    /// Returns `StockError::ProductNotFound` for unknown products,
    /// `StockError::InvalidQuantity` for non-positive quantities, and
    /// `StockError::Insufficient` with the shortfall when the variant cannot
    /// cover the request.
    pub fn reserve(
        &mut self,
        product_id: ProductId,
        color: &str,
        size: &str,
        quantity: i32,
    ) -> Result<i32, StockError> {
        let entry = self
            .entries
            .get_mut(&product_id)
            .ok_or(StockError::ProductNotFound(product_id))?;

        match entry.stock.decrement(color, size, quantity) {
            Ok(remaining) => {
                entry.units_removed = entry.units_removed.saturating_add(quantity);
                Ok(remaining)
            }
            Err(VariantError::Insufficient {
                available,
                requested,
                ..
            }) => Err(StockError::Insufficient(Box::new(StockShortfall {
                product_id,
                product_name: entry.product.name.clone(),
                color: color.to_owned(),
                size: size.to_owned(),
                available,
                requested,
                shortfall: requested - available.max(0),
            }))),
            Err(_) => Err(StockError::InvalidQuantity(quantity)),
        }
    }

    /// Write every touched product back to the database.
    ///
    /// # Errors
    ///
    /// Returns `StockError::Repository` if a write fails.
    pub async fn persist(self, conn: &mut PgConnection) -> Result<(), StockError> {
        for (id, entry) in self.entries {
            if entry.units_removed == 0 {
                continue;
            }
            ProductRepository::write_stock(conn, id, &entry.stock.to_json(), entry.units_removed)
                .await?;
            tracing::debug!(
                product_id = %id,
                units_removed = entry.units_removed,
                "variant stock decremented"
            );
        }
        Ok(())
    }
}

/// Parse a product's stored variants, treating corrupt data as empty.
fn parse_variants_lenient(product: &ProductSnapshot) -> VariantStock {
    let Some(raw) = product.variants.as_deref() else {
        return VariantStock::default();
    };

    VariantStock::parse(raw).unwrap_or_else(|e| {
        tracing::warn!(
            product_id = %product.id,
            product_name = %product.name,
            error = %e,
            "corrupt variants on product; treating as out of stock"
        );
        VariantStock::default()
    })
}

/// Decrement one variant of a product in its own transaction.
///
/// This is the `{color, size, quantity}` adjustment contract exposed at
/// `PUT /products/{id}/stock`.
///
/// # Errors
///
/// Returns the same errors as [`StockLedger::reserve`], plus
/// `StockError::Repository` on database failures.
pub async fn adjust_stock(
    pool: &PgPool,
    product_id: ProductId,
    color: &str,
    size: &str,
    quantity: i32,
) -> Result<StockAdjustment, StockError> {
    let mut tx = pool.begin().await?;

    let products = ProductRepository::lock_for_update(&mut tx, &[product_id]).await?;
    let mut ledger = StockLedger::new(products);
    let remaining = ledger.reserve(product_id, color, size, quantity)?;
    ledger.persist(&mut tx).await?;

    tx.commit().await?;

    tracing::info!(%product_id, color, size, quantity, remaining, "stock adjusted");

    Ok(StockAdjustment {
        product_id,
        color: color.to_owned(),
        size: size.to_owned(),
        remaining,
    })
}
