//! CLI subcommands.

pub mod migrate;
pub mod token;
pub mod user;
