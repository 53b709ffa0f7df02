//! CLI module graph.

pub mod command;
pub mod config;
pub mod cycles;
pub mod events;
pub mod export;
pub mod ledger;
pub mod orders;
pub mod output;
pub mod paths;
pub mod run;
pub mod status;
