//! Domain models for the orders API.
//!
//! These types are what handlers serialize; database row types stay private
//! to the `db` module.

pub mod address;
pub mod order;
pub mod product;
pub mod user;

pub use address::{Address, AddressInput};
pub use order::{Order, OrderItem};
pub use product::ProductSnapshot;
pub use user::CurrentUser;
