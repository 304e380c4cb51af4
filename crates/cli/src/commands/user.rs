//! User management commands.
//!
//! Users normally come from the authentication service; this command exists
//! so a local database has someone to own orders and addresses.
//!
//! # Usage
//!
//! ```bash
//! tindahan-cli user create -e buyer@example.ph
//! ```

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use tindahan_api::config::{ConfigError, database_url_from_env};
use tindahan_core::{Email, EmailError, UserId};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("User already exists with email: {0}")]
    UserExists(String),
}

/// Create a new user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserError` if the email is invalid, already taken, or the
/// database is unreachable.
pub async fn create_user(email: &str) -> Result<UserId, UserError> {
    let email = Email::parse(email)?;
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    let id: Option<i32> = sqlx::query_scalar(
        r"
        INSERT INTO shop.users (email)
        VALUES ($1)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        ",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await?;

    let id = id
        .map(UserId::new)
        .ok_or_else(|| UserError::UserExists(email.to_string()))?;

    tracing::info!(user_id = %id, %email, "User created");
    Ok(id)
}
