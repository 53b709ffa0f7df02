//! SQLite persistence adapters.
//!
//! Provides the SQLite-backed experiment ledger using Diesel ORM.

pub mod database;
pub mod ledger;
