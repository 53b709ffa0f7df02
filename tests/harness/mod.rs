//! Shared fixtures for integration tests.

pub mod temp_db;
