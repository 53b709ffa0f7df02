//! Core tournament types, free of storage and transport concerns.

pub mod book;
pub mod bot;
pub mod event;
pub mod id;
pub mod order;
pub mod score;
pub mod stats;
