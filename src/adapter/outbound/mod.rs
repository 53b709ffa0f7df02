//! Outbound adapters (driven side).

pub mod selector;
pub mod sqlite;
