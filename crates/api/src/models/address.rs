//! Shipping address domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tindahan_core::{AddressId, UserId};

/// Country stored when the client leaves it blank.
pub const DEFAULT_COUNTRY: &str = "Philippines";

/// A saved shipping address.
///
/// At most one address per user has `is_default` set. The application keeps
/// that invariant by clearing the flag on the user's other addresses whenever
/// a new default is written.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated address fields for an insert or update.
///
/// Optional fields are already substituted with their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
}
