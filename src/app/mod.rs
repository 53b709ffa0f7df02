//! Application wiring: configuration, the tournament supervisor, and the
//! pieces it drives.

pub mod config;
pub mod events;
pub mod feed;
pub mod report;
pub mod runner;
pub mod sim;
pub mod supervisor;
pub mod variation;
