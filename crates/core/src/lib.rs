//! Tindahan Core - Shared domain types.
//!
//! This crate provides the types shared by the Tindahan components:
//! - `api` - Orders and addresses HTTP service
//! - `cli` - Migrations and developer tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, money, and variant stock mappings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
