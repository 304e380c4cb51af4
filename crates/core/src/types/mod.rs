//! Core types for Tindahan.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod variants;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use variants::{StockError, VariantStock};
