//! Address repository for database operations.
//!
//! Writes that change the default flag run in a transaction so the
//! clear-others step and the write itself commit together.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use tindahan_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressInput};

const ADDRESS_COLUMNS: &str = "id, user_id, first_name, last_name, company, \
     address_line_1, address_line_2, city, state, postal_code, country, phone, \
     is_default, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    first_name: String,
    last_name: String,
    company: String,
    address_line_1: String,
    address_line_2: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    phone: String,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            first_name: row.first_name,
            last_name: row.last_name,
            company: row.company,
            address_line_1: row.address_line_1,
            address_line_2: row.address_line_2,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            phone: row.phone,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's addresses, default first, then newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM shop.addresses
             WHERE user_id = $1
             ORDER BY is_default DESC, created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one of the user's addresses by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_owned(&mut conn, user_id, id).await
    }

    /// Insert a new address, clearing the user's other defaults first when
    /// the new one is flagged default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    /// Returns `RepositoryError::NotFound` if the inserted row cannot be re-read.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            lock_owner(&mut tx, user_id).await?;
            clear_defaults(&mut tx, user_id, None).await?;
        }

        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO shop.addresses
                (user_id, first_name, last_name, company, address_line_1, address_line_2,
                 city, state, postal_code, country, phone, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.company)
        .bind(&input.address_line_1)
        .bind(&input.address_line_2)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.phone)
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await?;

        let address = fetch_owned(&mut tx, user_id, AddressId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok(address)
    }

    /// Update one of the user's addresses.
    ///
    /// Returns `None` when no address with that id belongs to the user, or
    /// when the row disappeared between the ownership check and the update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Option<Address>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            lock_owner(&mut tx, user_id).await?;
        }

        if fetch_owned(&mut tx, user_id, id).await?.is_none() {
            return Ok(None);
        }

        if input.is_default {
            clear_defaults(&mut tx, user_id, Some(id)).await?;
        }

        let result = sqlx::query(
            r"
            UPDATE shop.addresses
            SET first_name = $1, last_name = $2, company = $3,
                address_line_1 = $4, address_line_2 = $5, city = $6, state = $7,
                postal_code = $8, country = $9, phone = $10, is_default = $11,
                updated_at = NOW()
            WHERE id = $12 AND user_id = $13
            ",
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.company)
        .bind(&input.address_line_1)
        .bind(&input.address_line_2)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postal_code)
        .bind(&input.country)
        .bind(&input.phone)
        .bind(input.is_default)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let address = fetch_owned(&mut tx, user_id, id).await?;
        tx.commit().await?;

        Ok(address)
    }

    /// Delete one of the user's addresses.
    ///
    /// # Returns
    ///
    /// Returns `true` if the address was deleted, `false` if it didn't exist
    /// or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.addresses
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn fetch_owned(
    conn: &mut PgConnection,
    user_id: UserId,
    id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let row = sqlx::query_as::<_, AddressRow>(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM shop.addresses WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Lock the user's row; default changes for one user serialize behind it.
async fn lock_owner(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("SELECT id FROM shop.users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(())
}

/// Clear `is_default` on the user's addresses, optionally sparing one.
async fn clear_defaults(
    conn: &mut PgConnection,
    user_id: UserId,
    except: Option<AddressId>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE shop.addresses
        SET is_default = FALSE, updated_at = NOW()
        WHERE user_id = $1 AND is_default AND ($2::INTEGER IS NULL OR id <> $2)
        ",
    )
    .bind(user_id)
    .bind(except)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
