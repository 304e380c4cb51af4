//! Business logic services.
//!
//! - [`auth`] - Bearer token verification (and minting for tooling)
//! - [`orders`] - Transactional order placement
//! - [`stock`] - Variant stock reservation and adjustment

pub mod auth;
pub mod orders;
pub mod stock;

pub use auth::{Claims, TokenVerifier, issue_token};
pub use orders::{OrderError, OrderService};
pub use stock::{StockError, StockLedger, adjust_stock};
