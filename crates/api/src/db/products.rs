//! Product reads and stock writes.
//!
//! Only the order workflow and the stock adjustment touch products, and both
//! do so inside a transaction that holds the row locks taken here.

use sqlx::PgConnection;

use tindahan_core::{Money, ProductId};

use super::RepositoryError;
use crate::models::ProductSnapshot;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Money,
    variants: Option<String>,
    stock_quantity: i32,
}

impl From<ProductRow> for ProductSnapshot {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: row.price,
            variants: row.variants,
            stock_quantity: row.stock_quantity,
        }
    }
}

/// Product operations that run on a caller-owned transaction.
pub struct ProductRepository;

impl ProductRepository {
    /// Lock the given products for update, in ascending id order.
    ///
    /// Locking in a fixed order keeps two concurrent orders over the same
    /// products from deadlocking. Missing ids are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSnapshot>, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, variants, stock_quantity
            FROM shop.products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            ",
        )
        .bind(&raw_ids)
        .fetch_all(conn)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Write back a product's variant stock and reduce its aggregate count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product vanished.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn write_stock(
        conn: &mut PgConnection,
        id: ProductId,
        variants_json: &str,
        units_removed: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.products
            SET variants = $1,
                stock_quantity = GREATEST(stock_quantity - $2, 0),
                updated_at = NOW()
            WHERE id = $3
            ",
        )
        .bind(variants_json)
        .bind(units_removed)
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
