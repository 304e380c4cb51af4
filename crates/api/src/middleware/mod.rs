//! HTTP middleware stack for the orders API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, HTTP transactions)
//! 2. `TraceLayer` (request tracing, with a `request_id` span field)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is not a layer: protected handlers take the
//! [`RequireAuth`] extractor.

pub mod auth;
pub mod request_id;

pub use auth::RequireAuth;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
